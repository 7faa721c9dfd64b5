//! Redis-backed volume limiter

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Client;
use tracing::info;

use crate::domain::clock::{Clock, SystemClock};
use crate::domain::rate_limit::{FixedWindow, RateLimitDecision, VolumeLimiter};
use crate::domain::DomainError;

/// Configuration for the Redis limiter
#[derive(Debug, Clone)]
pub struct RedisLimiterConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Prefix for counter keys
    pub key_prefix: String,
    /// Connection timeout
    pub connection_timeout: Duration,
}

impl Default for RedisLimiterConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "ratelimit".to_string(),
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisLimiterConfig {
    /// Creates a new configuration with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Sets the connection timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// Fixed-window limiter sharing counters through Redis
///
/// Each window is one key, `{prefix}:{client}:{window}`, incremented and
/// given a TTL in a single atomic pipeline.
#[derive(Clone)]
pub struct RedisVolumeLimiter {
    connection: ConnectionManager,
    config: RedisLimiterConfig,
    window: FixedWindow,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for RedisVolumeLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisVolumeLimiter")
            .field("config", &self.config)
            .field("window", &self.window)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisVolumeLimiter {
    /// Connect to Redis, bounded by the configured connection timeout
    pub async fn connect(config: RedisLimiterConfig, window: FixedWindow) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::cache(format!("Failed to create Redis client: {}", e)))?;

        let connection = tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                DomainError::cache(format!(
                    "Timed out connecting to Redis after {:?}",
                    config.connection_timeout
                ))
            })?
            .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        info!(prefix = %config.key_prefix, "Connected to Redis rate limiter backend");

        Ok(Self {
            connection,
            config,
            window,
            clock: Arc::new(SystemClock),
        })
    }

    fn counter_key(&self, client_id: &str, window_index: u64) -> String {
        counter_key(&self.config.key_prefix, client_id, window_index)
    }
}

fn counter_key(prefix: &str, client_id: &str, window_index: u64) -> String {
    format!("{}:{}:{}", prefix, client_id, window_index)
}

#[async_trait]
impl VolumeLimiter for RedisVolumeLimiter {
    async fn check(&self, client_id: &str) -> Result<RateLimitDecision, DomainError> {
        let now = self.clock.now().timestamp().max(0) as u64;
        let (window_index, reset_in) = self.window.locate(now);
        let key = self.counter_key(client_id, window_index);
        let ttl = self.window.window.as_secs().max(1) as i64;

        let mut conn = self.connection.clone();
        let (count, _): (u64, i64) = redis::pipe()
            .atomic()
            .incr(&key, 1u64)
            .expire(&key, ttl)
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to count request: {}", e)))?;

        Ok(self.window.decide(count, reset_in))
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RedisLimiterConfig::default();

        assert_eq!(config.url, "redis://127.0.0.1:6379");
        assert_eq!(config.key_prefix, "ratelimit");
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_config_builder() {
        let config = RedisLimiterConfig::new("redis://cache:6379")
            .with_key_prefix("blog")
            .with_connection_timeout(Duration::from_millis(200));

        assert_eq!(config.url, "redis://cache:6379");
        assert_eq!(config.key_prefix, "blog");
        assert_eq!(config.connection_timeout, Duration::from_millis(200));
    }

    #[test]
    fn test_counter_key_layout() {
        assert_eq!(
            counter_key("ratelimit", "10.0.0.1:/generate-blog", 42),
            "ratelimit:10.0.0.1:/generate-blog:42"
        );
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let result =
            RedisVolumeLimiter::connect(RedisLimiterConfig::new("not a url"), FixedWindow::default())
                .await;

        assert!(matches!(result, Err(DomainError::Cache { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_within_timeout() {
        let config = RedisLimiterConfig::new("redis://127.0.0.1:1")
            .with_connection_timeout(Duration::from_millis(500));

        let result = RedisVolumeLimiter::connect(config, FixedWindow::default()).await;
        assert!(result.is_err());
    }
}
