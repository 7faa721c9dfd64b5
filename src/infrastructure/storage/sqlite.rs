//! SQLite connection pooling

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::domain::DomainError;

/// SQLite storage configuration
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database URL (e.g. `sqlite://api_keys.db` or `sqlite::memory:`)
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Pool acquire timeout in seconds
    pub acquire_timeout_secs: u64,
    /// How long a writer waits on a locked database, in milliseconds
    pub busy_timeout_ms: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://api_keys.db".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 5,
            busy_timeout_ms: 5000,
        }
    }
}

impl SqliteConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Private in-memory database, alive as long as the pool
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:").with_max_connections(1)
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_acquire_timeout(mut self, secs: u64) -> Self {
        self.acquire_timeout_secs = secs;
        self
    }

    pub fn with_busy_timeout(mut self, millis: u64) -> Self {
        self.busy_timeout_ms = millis;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// Open a connection pool for the configured database
pub async fn connect(config: &SqliteConfig) -> Result<SqlitePool, DomainError> {
    let mut options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| DomainError::configuration(format!("Invalid SQLite URL: {}", e)))?
        .create_if_missing(true)
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

    let mut pool_options = SqlitePoolOptions::new()
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));

    if config.is_in_memory() {
        // Every connection would otherwise see its own empty database
        pool_options = pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    } else {
        options = options.journal_mode(SqliteJournalMode::Wal);
        pool_options = pool_options.max_connections(config.max_connections);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to open SQLite database: {}", e)))?;

    info!(url = %config.url, "SQLite connection pool established");

    Ok(pool)
}
