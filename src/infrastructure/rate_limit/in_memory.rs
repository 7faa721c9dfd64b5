//! In-process volume limiter
//!
//! Fixed-window counters kept in a map; used when no Redis is configured.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::clock::{Clock, SystemClock};
use crate::domain::rate_limit::{FixedWindow, RateLimitDecision, VolumeLimiter};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct Counters {
    /// Window the counters belong to
    window_index: u64,
    /// Requests per client in that window
    counts: HashMap<String, u64>,
}

/// Volume limiter backed by process memory
#[derive(Debug)]
pub struct InMemoryVolumeLimiter {
    window: FixedWindow,
    counters: Mutex<Counters>,
    clock: Arc<dyn Clock>,
}

impl InMemoryVolumeLimiter {
    pub fn new(window: FixedWindow) -> Self {
        Self {
            window,
            counters: Mutex::new(Counters::default()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Create with a custom clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Number of clients tracked in the current window
    pub async fn tracked_clients(&self) -> usize {
        self.counters.lock().await.counts.len()
    }
}

#[async_trait]
impl VolumeLimiter for InMemoryVolumeLimiter {
    async fn check(&self, client_id: &str) -> Result<RateLimitDecision, DomainError> {
        let now = self.clock.now().timestamp().max(0) as u64;
        let (window_index, reset_in) = self.window.locate(now);

        let mut counters = self.counters.lock().await;

        // Counters from an earlier window are all stale
        if counters.window_index != window_index {
            counters.window_index = window_index;
            counters.counts.clear();
        }

        let count = counters.counts.entry(client_id.to_string()).or_insert(0);
        *count += 1;

        Ok(self.window.decide(*count, reset_in))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
