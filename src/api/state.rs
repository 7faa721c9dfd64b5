//! Application state for shared services

use std::sync::Arc;
use std::time::Duration;

use crate::domain::api_key::{AccessTier, ApiKeyRecord};
use crate::domain::auth::AuthorizationError;
use crate::domain::content::ContentGenerator;
use crate::domain::rate_limit::VolumeLimiter;
use crate::infrastructure::api_key::ApiKeyService;

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub api_key_service: Arc<dyn ApiKeyServiceTrait>,
    pub content_generator: Arc<dyn ContentGenerator>,
    /// Absent when volume limiting is disabled
    pub rate_limit: Option<RateLimitState>,
}

/// Volume limiter plus the deadline for a single check
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<dyn VolumeLimiter>,
    pub timeout: Duration,
}

impl AppState {
    pub fn new(
        api_key_service: Arc<dyn ApiKeyServiceTrait>,
        content_generator: Arc<dyn ContentGenerator>,
    ) -> Self {
        Self {
            api_key_service,
            content_generator,
            rate_limit: None,
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<dyn VolumeLimiter>, timeout: Duration) -> Self {
        self.rate_limit = Some(RateLimitState { limiter, timeout });
        self
    }
}

/// Trait for API key service operations
#[async_trait::async_trait]
pub trait ApiKeyServiceTrait: Send + Sync {
    async fn authorize(&self, presented: &str) -> Result<AccessTier, AuthorizationError>;
    async fn issue_key(
        &self,
        requested_tier: &str,
        presented: &str,
    ) -> Result<ApiKeyRecord, AuthorizationError>;
    async fn ping(&self) -> Result<(), AuthorizationError>;
}

#[async_trait::async_trait]
impl ApiKeyServiceTrait for ApiKeyService {
    async fn authorize(&self, presented: &str) -> Result<AccessTier, AuthorizationError> {
        ApiKeyService::authorize(self, presented).await
    }

    async fn issue_key(
        &self,
        requested_tier: &str,
        presented: &str,
    ) -> Result<ApiKeyRecord, AuthorizationError> {
        ApiKeyService::issue_key(self, requested_tier, presented).await
    }

    async fn ping(&self) -> Result<(), AuthorizationError> {
        ApiKeyService::ping(self).await
    }
}
