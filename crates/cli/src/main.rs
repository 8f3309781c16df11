//! skyrad — the skyra gateway daemon.
//!
//! Boots the process: parses flags, initializes tracing, loads environment
//! configuration, binds the listener, and serves until SIGINT/SIGTERM.
//! Shutdown drains in-flight connections for at most a fixed grace period;
//! exceeding it exits with status 1, as does any startup failure.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::Notify;
use tracing::{error, info};

use skyra_config::AppConfig;
use skyra_gateway::GatewayState;

/// How long draining connections may take after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(
    name = "skyrad",
    about = "skyra — gateway between clients and an LLM completion service",
    version
)]
struct Cli {
    /// Override the listen address (otherwise SKYRA_ADDR)
    #[arg(short, long)]
    addr: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = AppConfig::from_env();
    if let Some(addr) = cli.addr {
        config.addr = addr;
    }
    let addr = config.addr.clone();

    let state = Arc::new(GatewayState::new(config));
    let app = skyra_gateway::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "skyrad listening");

    let draining = Arc::new(Notify::new());
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(draining.clone()));

    tokio::select! {
        result = server => {
            result?;
            info!("server stopped");
        }
        _ = grace_expired(draining) => {
            error!(
                grace_secs = SHUTDOWN_GRACE.as_secs(),
                "graceful shutdown did not finish in time"
            );
            return Err("graceful shutdown timed out".into());
        }
    }

    Ok(())
}

/// Resolves when the process receives SIGINT or SIGTERM, then notifies the
/// grace-period watchdog.
async fn shutdown_signal(draining: Arc<Notify>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received, draining connections");
    draining.notify_one();
}

/// Resolves once the grace period after a shutdown signal has elapsed.
async fn grace_expired(draining: Arc<Notify>) {
    draining.notified().await;
    tokio::time::sleep(SHUTDOWN_GRACE).await;
}
