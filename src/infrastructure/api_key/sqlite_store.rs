//! SQLite-backed key store

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::warn;

use crate::domain::api_key::{ApiKeyRecord, KeyStore, KeyTier};
use crate::domain::DomainError;

/// Format of `created_at`, identical to SQLite's `CURRENT_TIMESTAMP`
pub const STORED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Key store over the `api_keys` table
#[derive(Debug, Clone)]
pub struct SqliteKeyStore {
    pool: SqlitePool,
}

impl SqliteKeyStore {
    /// Wrap a pool whose schema has been migrated
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn record_from_row(row: &SqliteRow) -> Result<ApiKeyRecord, DomainError> {
        let key: String = row
            .try_get("key")
            .map_err(|e| DomainError::storage(format!("Failed to read key column: {}", e)))?;

        let tier_raw: String = row
            .try_get("user_type")
            .map_err(|e| DomainError::storage(format!("Failed to read user_type column: {}", e)))?;
        let tier = tier_raw.parse::<KeyTier>().map_err(|e| {
            DomainError::internal(format!("Corrupt tier in api_keys row: {}", e))
        })?;

        // Non-text timestamps are treated like unparsable text
        let created_at: Option<String> = row.try_get("created_at").unwrap_or(None);
        let issued_at = parse_issued_at(created_at.as_deref());
        if issued_at.is_none() {
            warn!(
                key_prefix = %key_prefix(&key),
                raw = ?created_at,
                "Unparsable issuance timestamp"
            );
        }

        let usage_count: i64 = row
            .try_get("usage_count")
            .map_err(|e| DomainError::storage(format!("Failed to read usage_count column: {}", e)))?;

        Ok(ApiKeyRecord::from_parts(
            key,
            tier,
            issued_at,
            clamp_count(usage_count),
        ))
    }
}

#[async_trait]
impl KeyStore for SqliteKeyStore {
    async fn insert(
        &self,
        key: &str,
        tier: KeyTier,
        issued_at: DateTime<Utc>,
    ) -> Result<ApiKeyRecord, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO api_keys (key, user_type, created_at, usage_count)
            VALUES (?, ?, ?, 0)
            "#,
        )
        .bind(key)
        .bind(tier.as_str())
        .bind(format_issued_at(issued_at))
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                DomainError::conflict("API key already exists")
            }
            other => DomainError::storage(format!("Failed to insert API key: {}", other)),
        })?;

        Ok(ApiKeyRecord::new(key, tier, truncate_to_stored(issued_at)))
    }

    async fn lookup(&self, key: &str) -> Result<Option<ApiKeyRecord>, DomainError> {
        let row = sqlx::query(
            "SELECT key, user_type, created_at, usage_count FROM api_keys WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to look up API key: {}", e)))?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    async fn increment_usage(&self, key: &str) -> Result<u32, DomainError> {
        let count: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE api_keys
            SET usage_count = usage_count + 1
            WHERE key = ?
            RETURNING usage_count
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to increment usage: {}", e)))?;

        count
            .map(clamp_count)
            .ok_or_else(|| DomainError::not_found("API key not found"))
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("SQLite ping failed: {}", e)))?;

        Ok(())
    }
}

fn format_issued_at(at: DateTime<Utc>) -> String {
    at.format(STORED_TIMESTAMP_FORMAT).to_string()
}

fn truncate_to_stored(at: DateTime<Utc>) -> DateTime<Utc> {
    use chrono::SubsecRound;
    at.trunc_subsecs(0)
}

/// Parse a stored issuance timestamp.
///
/// Accepts `CURRENT_TIMESTAMP` text (with or without fractional seconds)
/// and RFC 3339. Naive values are UTC.
pub fn parse_issued_at(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, STORED_TIMESTAMP_FORMAT) {
        return Some(naive.and_utc());
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn clamp_count(raw: i64) -> u32 {
    u32::try_from(raw.max(0)).unwrap_or(u32::MAX)
}

fn key_prefix(key: &str) -> String {
    key.chars().take(6).collect()
}
