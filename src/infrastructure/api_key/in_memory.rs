//! In-memory key store implementation

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::api_key::{ApiKeyRecord, KeyStore, KeyTier};
use crate::domain::DomainError;

/// In-memory implementation of `KeyStore`
///
/// Not durable. Supports fault injection (`set_should_fail`, `set_latency`)
/// for exercising the retry and timeout paths.
#[derive(Debug, Default)]
pub struct InMemoryKeyStore {
    keys: Arc<RwLock<HashMap<String, ApiKeyRecord>>>,
    should_fail: Arc<RwLock<bool>>,
    latency: Arc<RwLock<Option<Duration>>>,
}

impl InMemoryKeyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with records
    pub fn with_records(records: impl IntoIterator<Item = ApiKeyRecord>) -> Self {
        let keys = records
            .into_iter()
            .map(|r| (r.key().to_string(), r))
            .collect();

        Self {
            keys: Arc::new(RwLock::new(keys)),
            ..Default::default()
        }
    }

    /// Make every operation fail with a storage error
    pub async fn set_should_fail(&self, fail: bool) {
        *self.should_fail.write().await = fail;
    }

    /// Delay every operation
    pub async fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write().await = latency;
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }

    async fn simulate_faults(&self) -> Result<(), DomainError> {
        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if *self.should_fail.read().await {
            return Err(DomainError::storage("In-memory store configured to fail"));
        }

        Ok(())
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn insert(
        &self,
        key: &str,
        tier: KeyTier,
        issued_at: DateTime<Utc>,
    ) -> Result<ApiKeyRecord, DomainError> {
        self.simulate_faults().await?;
        let mut keys = self.keys.write().await;

        if keys.contains_key(key) {
            return Err(DomainError::conflict("API key already exists"));
        }

        let record = ApiKeyRecord::new(key, tier, issued_at);
        keys.insert(key.to_string(), record.clone());

        Ok(record)
    }

    async fn lookup(&self, key: &str) -> Result<Option<ApiKeyRecord>, DomainError> {
        self.simulate_faults().await?;
        let keys = self.keys.read().await;
        Ok(keys.get(key).cloned())
    }

    async fn increment_usage(&self, key: &str) -> Result<u32, DomainError> {
        self.simulate_faults().await?;
        let mut keys = self.keys.write().await;

        keys.get_mut(key)
            .map(ApiKeyRecord::record_usage)
            .ok_or_else(|| DomainError::not_found("API key not found"))
    }

    async fn ping(&self) -> Result<(), DomainError> {
        self.simulate_faults().await
    }
}
