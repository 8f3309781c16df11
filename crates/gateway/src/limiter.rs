//! Fixed-window rate limiting keyed by client identity.
//!
//! Every call within a window counts, admitted or rejected, and a window
//! is replaced wholesale once it is a full window old. Bursts straddling a
//! window boundary can admit up to twice the per-window maximum.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Key count beyond which expired windows are swept on access.
const SWEEP_HIGH_WATER: usize = 10_000;

struct RateWindow {
    window_start: Instant,
    count: u32,
}

/// In-memory per-key fixed-window counter.
///
/// Thread-safe via `std::sync::Mutex`; the critical section is a map probe
/// plus an integer increment, held across no I/O.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request for `key`. Returns `true` if it is admitted.
    pub fn admit(&self, key: &str) -> bool {
        self.admit_at(key, Instant::now())
    }

    fn admit_at(&self, key: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        if windows.len() > SWEEP_HIGH_WATER {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.window_start) < window);
        }

        let win = windows.entry(key.to_string()).or_insert(RateWindow {
            window_start: now,
            count: 0,
        });
        if now.duration_since(win.window_start) >= self.window {
            win.window_start = now;
            win.count = 0;
        }
        win.count += 1;

        win.count <= self.max_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_the_maximum() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.admit_at("1.2.3.4", now));
        assert!(limiter.admit_at("1.2.3.4", now));
        assert!(limiter.admit_at("1.2.3.4", now));
        assert!(!limiter.admit_at("1.2.3.4", now));
    }

    #[test]
    fn window_expiry_resets_the_count() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.admit_at("k", now));
        assert!(limiter.admit_at("k", now));
        assert!(!limiter.admit_at("k", now + Duration::from_secs(59)));

        // One full window later the key starts fresh.
        assert!(limiter.admit_at("k", now + Duration::from_secs(60)));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.admit_at("a", now));
        assert!(!limiter.admit_at("a", now));
        assert!(limiter.admit_at("b", now));
    }

    #[test]
    fn rejected_requests_still_count() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.admit_at("k", now));
        for i in 0..5 {
            assert!(
                !limiter.admit_at("k", now + Duration::from_secs(i)),
                "call {i} should stay rejected"
            );
        }
    }

    #[test]
    fn concurrent_admits_account_every_call() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(100, Duration::from_secs(60)));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            handles.push(std::thread::spawn(move || {
                let mut admitted = 0u32;
                for _ in 0..25 {
                    if limiter.admit("shared") {
                        admitted += 1;
                    }
                }
                admitted
            }));
        }

        let admitted: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // 200 calls against a limit of 100 admit exactly 100 — no lost
        // updates under interleaving.
        assert_eq!(admitted, 100);
    }

    #[test]
    fn sweep_evicts_expired_keys() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        for i in 0..=SWEEP_HIGH_WATER {
            limiter.admit_at(&format!("key-{i}"), now);
        }
        assert!(limiter.windows.lock().unwrap().len() > SWEEP_HIGH_WATER);

        // A call one window later sweeps everything stale.
        limiter.admit_at("fresh", now + Duration::from_secs(60));
        assert_eq!(limiter.windows.lock().unwrap().len(), 1);
    }
}
