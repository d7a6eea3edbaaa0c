//! Per-key rate limiting for the thin HTTP surface. Re-targeted from
//! the teacher's Redis-backed counters (`INCR`/`EXPIRE`) to an
//! in-memory sliding window — Kudzu's hot tier is already the
//! in-memory concurrent map (§4.4); there is no networked cache in
//! this crate to share counters through.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Clone, Copy)]
pub struct RateLimitConfig {
    pub per_second: u32,
    pub per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { per_second: 5, per_minute: 100 }
    }
}

#[derive(Debug)]
pub enum RateLimitResult {
    Allowed { remaining_second: u32, remaining_minute: u32 },
    Exceeded { retry_after_seconds: u32 },
}

#[derive(Default)]
struct Window {
    timestamps: Vec<Instant>,
}

impl Window {
    fn prune(&mut self, now: Instant, horizon: Duration) {
        self.timestamps.retain(|t| now.duration_since(*t) <= horizon);
    }
}

/// One instance shared behind `Arc` across the router's handlers.
#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn check(&self, key_id: &str, config: &RateLimitConfig) -> RateLimitResult {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");
        let window = windows.entry(key_id.to_string()).or_default();
        window.prune(now, Duration::from_secs(60));

        let per_second_count = window.timestamps.iter().filter(|t| now.duration_since(**t) <= Duration::from_secs(1)).count() as u32;
        if per_second_count >= config.per_second {
            return RateLimitResult::Exceeded { retry_after_seconds: 1 };
        }

        let per_minute_count = window.timestamps.len() as u32;
        if per_minute_count >= config.per_minute {
            return RateLimitResult::Exceeded { retry_after_seconds: 60 };
        }

        window.timestamps.push(now);
        RateLimitResult::Allowed {
            remaining_second: config.per_second.saturating_sub(per_second_count + 1),
            remaining_minute: config.per_minute.saturating_sub(per_minute_count + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_requests_under_the_limit() {
        let limiter = RateLimiter::default();
        let config = RateLimitConfig { per_second: 5, per_minute: 100 };
        for _ in 0..5 {
            assert!(matches!(limiter.check("k1", &config), RateLimitResult::Allowed { .. }));
        }
    }

    #[test]
    fn exceeding_per_second_limit_is_rejected() {
        let limiter = RateLimiter::default();
        let config = RateLimitConfig { per_second: 2, per_minute: 100 };
        assert!(matches!(limiter.check("k1", &config), RateLimitResult::Allowed { .. }));
        assert!(matches!(limiter.check("k1", &config), RateLimitResult::Allowed { .. }));
        assert!(matches!(limiter.check("k1", &config), RateLimitResult::Exceeded { .. }));
    }

    #[test]
    fn different_keys_have_independent_windows() {
        let limiter = RateLimiter::default();
        let config = RateLimitConfig { per_second: 1, per_minute: 100 };
        assert!(matches!(limiter.check("k1", &config), RateLimitResult::Allowed { .. }));
        assert!(matches!(limiter.check("k2", &config), RateLimitResult::Allowed { .. }));
    }
}
