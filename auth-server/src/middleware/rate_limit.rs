//! # In-Memory Rate Limiting
//!
//! A fixed-window counter per `(key, window)` kept in a [`DashMap`], the same
//! data structure the source repo reaches for whenever it needs concurrent
//! map access without a mutex. One process's counts aren't shared across a
//! multi-instance deployment — a deployment that needs that reaches for a
//! Redis-backed limiter instead, which is why [`RateLimiter::check`] takes
//! the config as a parameter rather than hardcoding a backend.

use std::sync::atomic::{AtomicU32, AtomicI64};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;

use shared::errors::ApiError;

struct WindowCounter {
    count: AtomicU32,
    window_started_at: AtomicI64,
}

/// Tracks request counts per key (typically `"{ip}:{route}"`) within a
/// rolling fixed window. Cheap to clone — the inner map is reference-counted
/// — so one instance lives in [`crate::context::AuthContext`]-adjacent
/// application state and is shared across every worker thread.
#[derive(Clone)]
pub struct RateLimiter {
    counters: Arc<DashMap<String, WindowCounter>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self { counters: Arc::new(DashMap::new()) }
    }

    /// Increments the counter for `key`, resetting it if the window has
    /// elapsed. Returns `Err(TooManyRequests)` once the count exceeds
    /// `max_requests` for the remainder of the current window.
    pub fn check(&self, key: &str, max_requests: u32, window_seconds: u64) -> Result<(), ApiError> {
        let now = Utc::now().timestamp();

        let entry = self.counters.entry(key.to_string()).or_insert_with(|| WindowCounter {
            count: AtomicU32::new(0),
            window_started_at: AtomicI64::new(now),
        });

        let window_started_at = entry.window_started_at.load(std::sync::atomic::Ordering::Relaxed);
        if now - window_started_at >= window_seconds as i64 {
            entry.window_started_at.store(now, std::sync::atomic::Ordering::Relaxed);
            entry.count.store(1, std::sync::atomic::Ordering::Relaxed);
            return Ok(());
        }

        let count = entry.count.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
        if count > max_requests {
            let retry_after = window_seconds as i64 - (now - window_started_at);
            return Err(ApiError::TooManyRequests { retry_after_seconds: retry_after.max(1) as u64 });
        }
        Ok(())
    }

    /// Drops counters whose window has long since elapsed, so a
    /// long-running process doesn't accumulate one entry per distinct IP
    /// forever. Call periodically from a background task; never required
    /// for correctness, only for memory.
    pub fn sweep(&self, max_age_seconds: i64) {
        let now = Utc::now().timestamp();
        self.counters.retain(|_, counter| now - counter.window_started_at.load(std::sync::atomic::Ordering::Relaxed) < max_age_seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_requests_under_the_limit() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            assert!(limiter.check("ip:/login", 5, 60).is_ok());
        }
    }

    #[test]
    fn rejects_once_the_limit_is_exceeded() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            limiter.check("ip:/login", 5, 60).unwrap();
        }
        let result = limiter.check("ip:/login", 5, 60);
        assert!(matches!(result, Err(ApiError::TooManyRequests { .. })));
    }

    #[test]
    fn different_keys_are_independent() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            limiter.check("ip-a:/login", 5, 60).unwrap();
        }
        assert!(limiter.check("ip-b:/login", 5, 60).is_ok());
    }
}
