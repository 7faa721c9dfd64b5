//! Request volume limiting
//!
//! Fixed-window counting per client identity, independent of trial quota.
//! Callers treat backend errors as "allowed".

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Fixed window limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedWindow {
    /// Requests allowed per window
    pub max_requests: u32,
    /// Window length
    pub window: Duration,
}

impl Default for FixedWindow {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(60),
        }
    }
}

impl FixedWindow {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    /// Window index and seconds left in it, for a unix timestamp in seconds
    pub fn locate(&self, unix_secs: u64) -> (u64, u64) {
        let window_secs = self.window.as_secs().max(1);
        let index = unix_secs / window_secs;
        let remaining = window_secs - (unix_secs % window_secs);
        (index, remaining)
    }

    /// Decision for the `count`-th request (1-based) in the current window
    pub fn decide(&self, count: u64, reset_in_seconds: u64) -> RateLimitDecision {
        let limit = self.max_requests;

        if count > u64::from(limit) {
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                limit,
                reset_in_seconds,
            }
        } else {
            RateLimitDecision {
                allowed: true,
                remaining: limit.saturating_sub(count as u32),
                limit,
                reset_in_seconds,
            }
        }
    }
}

/// Result of a rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// Total limit for the window
    pub limit: u32,
    /// Time until the window resets (in seconds)
    pub reset_in_seconds: u64,
}

/// Counts requests per client and window
#[async_trait]
pub trait VolumeLimiter: Send + Sync + std::fmt::Debug {
    /// Count one request for `client_id` and report whether it may proceed
    async fn check(&self, client_id: &str) -> Result<RateLimitDecision, DomainError>;

    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_window() {
        let window = FixedWindow::new(5, Duration::from_secs(60));

        assert_eq!(window.locate(120), (2, 60));
        assert_eq!(window.locate(179), (2, 1));
        assert_eq!(window.locate(180), (3, 60));
    }

    #[test]
    fn test_decide_counts() {
        let window = FixedWindow::default();

        let first = window.decide(1, 60);
        assert!(first.allowed);
        assert_eq!(first.remaining, 4);

        let fifth = window.decide(5, 30);
        assert!(fifth.allowed);
        assert_eq!(fifth.remaining, 0);

        let sixth = window.decide(6, 30);
        assert!(!sixth.allowed);
        assert_eq!(sixth.limit, 5);
        assert_eq!(sixth.reset_in_seconds, 30);
    }

    #[test]
    fn test_zero_length_window_does_not_divide_by_zero() {
        let window = FixedWindow::new(1, Duration::from_millis(10));
        assert_eq!(window.locate(10), (10, 1));
    }
}
