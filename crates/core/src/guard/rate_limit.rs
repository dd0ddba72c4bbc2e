//! Sliding-window rate limiting for validation attempts.
//!
//! Counts attempts per key over a rolling window. The limiter is
//! process-local and deliberately simple: its job is to blunt identifier
//! probing, not to replace an edge rate limiter.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Configuration for the validation-attempt limiter.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Maximum attempts per key within the window.
    pub max_attempts: u32,
    /// Window length.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            window: Duration::from_secs(60),
        }
    }
}

/// Sliding-window attempt counter keyed by an opaque string.
pub struct RateLimiter {
    config: RateLimitConfig,
    attempts: DashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            attempts: DashMap::new(),
        }
    }

    /// Records an attempt for `key` and returns `false` if the key has
    /// exceeded the window's budget.
    ///
    /// Attempts past the limit still count: a client hammering a rejected
    /// key does not earn its way back in until it backs off for a full
    /// window.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.attempts.entry(key.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < self.config.window);
        entry.push(now);
        entry.len() <= self.config.max_attempts as usize
    }

    /// Drops keys whose every attempt has aged out of the window.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.attempts
            .retain(|_, attempts| attempts.iter().any(|t| now.duration_since(*t) < self.config.window));
    }

    /// Number of tracked keys, for tests and diagnostics.
    pub fn tracked_keys(&self) -> usize {
        self.attempts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_attempts: u32, window_ms: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_attempts,
            window: Duration::from_millis(window_ms),
        })
    }

    #[test]
    fn test_allows_up_to_budget() {
        let limiter = limiter(3, 60_000);
        assert!(limiter.check("k"));
        assert!(limiter.check("k"));
        assert!(limiter.check("k"));
        assert!(!limiter.check("k"));
        assert!(!limiter.check("k"));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = limiter(1, 60_000);
        assert!(limiter.check("a"));
        assert!(limiter.check("b"));
        assert!(!limiter.check("a"));
    }

    #[test]
    fn test_window_slides() {
        let limiter = limiter(1, 20);
        assert!(limiter.check("k"));
        assert!(!limiter.check("k"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check("k"));
    }

    #[test]
    fn test_sweep_drops_idle_keys() {
        let limiter = limiter(5, 20);
        limiter.check("k");
        assert_eq!(limiter.tracked_keys(), 1);
        std::thread::sleep(Duration::from_millis(30));
        limiter.sweep();
        assert_eq!(limiter.tracked_keys(), 0);
    }
}
