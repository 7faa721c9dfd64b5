//! API key service
//!
//! Authorizes presented keys and issues new ones on top of a `KeyStore`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::SubsecRound;
use tracing::{debug, info, warn};

use crate::domain::api_key::{
    validate_api_key_format, AccessTier, ApiKeyRecord, KeyStore, KeyTier,
};
use crate::domain::auth::{AuthorizationError, AuthorizationPolicy};
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::DomainError;

use super::generator::KeyGenerator;
use super::key_locks::KeyLocks;

/// Timeout and retry budget for key store access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreAccessPolicy {
    /// Upper bound on a single store call
    pub timeout: Duration,
    /// Attempts per read, and key generations per issuance
    pub attempts: u32,
    /// Pause between read attempts
    pub backoff: Duration,
}

impl Default for StoreAccessPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Why a single store call did not produce a value
#[derive(Debug)]
enum StoreFailure {
    /// Timed out or failed transiently
    Unavailable(String),
    /// The store answered with a non-transient error
    Rejected(DomainError),
}

impl From<StoreFailure> for AuthorizationError {
    fn from(failure: StoreFailure) -> Self {
        match failure {
            StoreFailure::Unavailable(message) => AuthorizationError::StoreUnavailable(message),
            StoreFailure::Rejected(e) => AuthorizationError::Internal(e.to_string()),
        }
    }
}

/// Key lifecycle and usage metering
pub struct ApiKeyService {
    store: Arc<dyn KeyStore>,
    policy: AuthorizationPolicy,
    generator: KeyGenerator,
    locks: KeyLocks,
    clock: Arc<dyn Clock>,
    access: StoreAccessPolicy,
}

impl std::fmt::Debug for ApiKeyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyService")
            .field("policy", &self.policy)
            .field("generator", &self.generator)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

impl ApiKeyService {
    /// Create a service using the system clock and default store access
    pub fn new(store: Arc<dyn KeyStore>, policy: AuthorizationPolicy) -> Self {
        Self {
            store,
            policy,
            generator: KeyGenerator::default(),
            locks: KeyLocks::new(),
            clock: Arc::new(SystemClock),
            access: StoreAccessPolicy::default(),
        }
    }

    /// Create with a custom generator
    pub fn with_generator(mut self, generator: KeyGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Create with a custom clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Create with a custom timeout and retry budget
    pub fn with_store_access(mut self, access: StoreAccessPolicy) -> Self {
        self.access = access;
        self
    }

    /// Decide the access tier for a presented key.
    ///
    /// Trial calls that pass every check are metered; a rejected call never
    /// consumes quota. Calls for the same key are serialized.
    pub async fn authorize(&self, presented: &str) -> Result<AccessTier, AuthorizationError> {
        if self.policy.is_admin(presented) {
            debug!("Admin key presented");
            return Ok(AccessTier::Admin);
        }

        // Malformed keys cannot be stored, skip the lookup
        if let Err(e) = validate_api_key_format(presented) {
            debug!(reason = %e, "Rejected malformed API key");
            return Err(AuthorizationError::InvalidKey);
        }

        let _guard = self.locks.acquire(presented).await;

        let record = self
            .read("lookup", || self.store.lookup(presented))
            .await?;
        let now = self.clock.now();

        let grant = self
            .policy
            .evaluate(record.as_ref(), now)
            .inspect_err(|e| {
                debug!(
                    key_prefix = %key_prefix(presented),
                    reason = e.code(),
                    "Authorization denied"
                );
            })?;

        if grant.metered {
            let count = self
                .attempt("increment_usage", self.store.increment_usage(presented))
                .await?;
            debug!(
                key_prefix = %key_prefix(presented),
                usage_count = count,
                quota = self.policy.trial_rules().quota,
                "Trial usage recorded"
            );
        }

        Ok(grant.tier)
    }

    /// Issue a new key of the requested tier. Only the admin may issue.
    pub async fn issue_key(
        &self,
        requested_tier: &str,
        presented: &str,
    ) -> Result<ApiKeyRecord, AuthorizationError> {
        if !self.policy.is_admin(presented) {
            warn!(
                key_prefix = %key_prefix(presented),
                "Key issuance attempted without admin key"
            );
            return Err(AuthorizationError::Unauthorized);
        }

        let tier: KeyTier = requested_tier
            .parse()
            .map_err(|_| AuthorizationError::InvalidTier(requested_tier.to_string()))?;

        for _ in 0..self.access.attempts.max(1) {
            let key = self.generator.generate();
            let issued_at = self.clock.now().trunc_subsecs(0);

            match self
                .attempt("insert", self.store.insert(&key, tier, issued_at))
                .await
            {
                Ok(record) => {
                    info!(tier = %tier, key_prefix = %key_prefix(&key), "API key issued");
                    return Ok(record);
                }
                Err(StoreFailure::Rejected(DomainError::Conflict { .. })) => {
                    warn!("Generated key collided with an existing key, regenerating");
                }
                Err(failure) => return Err(failure.into()),
            }
        }

        Err(AuthorizationError::Internal(
            "Could not generate a unique API key".to_string(),
        ))
    }

    /// Point read, with the same retry budget as authorization
    pub async fn lookup(&self, key: &str) -> Result<Option<ApiKeyRecord>, AuthorizationError> {
        self.read("lookup", || self.store.lookup(key)).await
    }

    /// Store liveness probe, attempted once
    pub async fn ping(&self) -> Result<(), AuthorizationError> {
        self.attempt("ping", self.store.ping())
            .await
            .map_err(Into::into)
    }

    /// Read with timeout and retry on transient failure
    async fn read<T, F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, AuthorizationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let attempts = self.access.attempts.max(1);
        let mut last_failure = String::new();

        for attempt in 1..=attempts {
            match self.attempt(operation, call()).await {
                Ok(value) => return Ok(value),
                Err(StoreFailure::Unavailable(message)) => {
                    warn!(operation, attempt, attempts, error = %message, "Key store read failed");
                    last_failure = message;
                }
                Err(failure) => return Err(failure.into()),
            }

            if attempt < attempts {
                tokio::time::sleep(self.access.backoff).await;
            }
        }

        Err(AuthorizationError::StoreUnavailable(last_failure))
    }

    /// Single store call bounded by the configured timeout
    async fn attempt<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, DomainError>>,
    ) -> Result<T, StoreFailure> {
        match tokio::time::timeout(self.access.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) if e.is_transient() => Err(StoreFailure::Unavailable(e.to_string())),
            Ok(Err(e)) => Err(StoreFailure::Rejected(e)),
            Err(_) => Err(StoreFailure::Unavailable(format!(
                "{} timed out after {:?}",
                operation, self.access.timeout
            ))),
        }
    }
}

/// Leading characters of a key, safe to log
pub(crate) fn key_prefix(key: &str) -> String {
    key.chars().take(6).collect()
}
