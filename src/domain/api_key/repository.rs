//! Key store trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::entity::{ApiKeyRecord, KeyTier};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Persistent table of issued API keys
///
/// Implementations must enforce key uniqueness and make
/// `increment_usage` atomic with respect to other writers.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Persist a new key with zero usage.
    ///
    /// Fails with `DomainError::Conflict` when the key already exists.
    async fn insert(
        &self,
        key: &str,
        tier: KeyTier,
        issued_at: DateTime<Utc>,
    ) -> Result<ApiKeyRecord, DomainError>;

    /// Point read by key
    async fn lookup(&self, key: &str) -> Result<Option<ApiKeyRecord>, DomainError>;

    /// Increment the usage counter and return the new value.
    ///
    /// Fails with `DomainError::NotFound` when the key is absent.
    async fn increment_usage(&self, key: &str) -> Result<u32, DomainError>;

    /// Cheap connectivity probe
    async fn ping(&self) -> Result<(), DomainError>;
}
