//! Sliding-window admission control.
//!
//! [`RateLimiter`] counts admissions inside a trailing window that is
//! re-evaluated on every check. It is a sliding-window counter, not a token
//! bucket: a full window's worth of requests can land back to back at a
//! window boundary, and a caller that waits exactly one window after being
//! blocked is always admitted again.
//!
//! Time is read from [`tokio::time::Instant`], so tests can drive the window
//! with `tokio::time::pause()` / `advance()`.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::telemetry;

/// Configuration for the rate limiter.
///
/// ```rust
/// # use assay::RateLimitConfig;
/// # use std::time::Duration;
/// let config = RateLimitConfig::new()
///     .limit(10)
///     .window(Duration::from_secs(1));
/// assert_eq!(config.limit, 10);
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Admissions allowed per window. Default: 60.
    pub limit: usize,
    /// Length of the trailing window. Default: 60 seconds.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 60,
            window: Duration::from_millis(60_000),
        }
    }
}

impl RateLimitConfig {
    /// Create a new config with the default 60-per-minute budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of admissions per window.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the window length.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// Sliding-window rate limiter. State is in-memory only.
pub struct RateLimiter {
    config: RateLimitConfig,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            timestamps: Mutex::new(VecDeque::new()),
            config,
        }
    }

    /// Check whether a request may proceed now.
    ///
    /// Drops timestamps that have left the window, then records `now` and
    /// returns `true` if fewer than `limit` remain. A blocked call returns
    /// `false` and records nothing.
    pub fn admit(&self) -> bool {
        let now = Instant::now();
        let mut timestamps = self
            .timestamps
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Timestamps are pushed in order, so expired ones sit at the front.
        while let Some(oldest) = timestamps.front() {
            if now.duration_since(*oldest) >= self.config.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() < self.config.limit {
            timestamps.push_back(now);
            true
        } else {
            metrics::counter!(telemetry::RATE_LIMITED_TOTAL).increment(1);
            debug!(
                in_window = timestamps.len(),
                limit = self.config.limit,
                "request blocked by rate limiter"
            );
            false
        }
    }

    /// Admissions currently counted against the window (as of the last check).
    pub fn in_window(&self) -> usize {
        self.timestamps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn admits_up_to_limit_then_blocks() {
        let limiter = RateLimiter::new(RateLimitConfig::new().limit(3));
        assert!(limiter.admit());
        assert!(limiter.admit());
        assert!(limiter.admit());
        assert!(!limiter.admit());
        assert_eq!(limiter.in_window(), 3, "blocked call must not be recorded");
    }

    #[tokio::test(start_paused = true)]
    async fn huge_limit_allocates_lazily() {
        let limiter = RateLimiter::new(RateLimitConfig::new().limit(usize::MAX));
        assert!(limiter.admit());
        assert_eq!(limiter.in_window(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waiting_exactly_one_window_readmits() {
        let window = Duration::from_millis(500);
        let limiter = RateLimiter::new(RateLimitConfig::new().limit(1).window(window));

        assert!(limiter.admit());
        assert!(!limiter.admit());

        tokio::time::advance(window).await;
        assert!(limiter.admit());
    }

    #[tokio::test(start_paused = true)]
    async fn window_slides_per_timestamp() {
        let limiter = RateLimiter::new(
            RateLimitConfig::new()
                .limit(2)
                .window(Duration::from_millis(100)),
        );

        assert!(limiter.admit()); // t=0
        tokio::time::advance(Duration::from_millis(60)).await;
        assert!(limiter.admit()); // t=60
        assert!(!limiter.admit());

        // t=100: the first admission leaves the window, the second stays.
        tokio::time::advance(Duration::from_millis(40)).await;
        assert!(limiter.admit());
        assert!(!limiter.admit());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_limit_blocks_everything() {
        let limiter = RateLimiter::new(RateLimitConfig::new().limit(0));
        assert!(!limiter.admit());
    }
}
