//! Autoblog Gateway
//!
//! HTTP gateway in front of an LLM blog writer:
//! - Admin-issued API keys with trial and paid tiers
//! - Trial expiry and quota metering backed by SQLite
//! - Per-client request volume limiting (Redis or in-process)

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use domain::auth::AuthorizationPolicy;
use domain::content::ContentGenerator;
use domain::rate_limit::VolumeLimiter;
use infrastructure::{
    api_key::{ApiKeyService, KeyGenerator, SqliteKeyStore},
    llm::{HttpClient, OpenAiBlogGenerator},
    rate_limit::{InMemoryVolumeLimiter, RedisLimiterConfig, RedisVolumeLimiter},
    storage::{connect, run_storage_migrations},
};
use tracing::{info, warn};

/// Create the application state with all services initialized
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let key_service = create_key_service(config).await?;
    let content_generator = create_content_generator(config)?;

    let mut state = AppState::new(Arc::new(key_service), content_generator);

    if let Some(limiter) = create_volume_limiter(config).await {
        state = state.with_rate_limiter(limiter, config.rate_limit.timeout());
    }

    Ok(state)
}

/// Open the key database, apply migrations and build the key service
pub async fn create_key_service(config: &AppConfig) -> anyhow::Result<ApiKeyService> {
    let pool = connect(&config.database.sqlite()).await?;
    run_storage_migrations(&pool).await?;

    let policy = AuthorizationPolicy::new(config.auth.admin_principal()?, config.auth.trial_rules());

    Ok(
        ApiKeyService::new(Arc::new(SqliteKeyStore::new(pool)), policy)
            .with_generator(KeyGenerator::new(config.auth.key_prefix.clone()))
            .with_store_access(config.auth.store_access()),
    )
}

/// Build the OpenAI-backed blog generator
pub fn create_content_generator(config: &AppConfig) -> anyhow::Result<Arc<dyn ContentGenerator>> {
    let openai = &config.openai;

    if openai.api_key.trim().is_empty() {
        anyhow::bail!("openai.api_key (or OPENAI_API_KEY) must be set");
    }

    let client = HttpClient::with_timeout(std::time::Duration::from_secs(openai.timeout_secs))?;
    let generator = OpenAiBlogGenerator::with_base_url(client, &openai.api_key, &openai.base_url)
        .with_model(&openai.model);

    info!(model = %openai.model, "Content generator: OpenAI");

    Ok(Arc::new(generator))
}

/// Pick the volume limiter backend; `None` when limiting is off
///
/// An unreachable Redis disables limiting instead of failing startup.
pub async fn create_volume_limiter(config: &AppConfig) -> Option<Arc<dyn VolumeLimiter>> {
    let limits = &config.rate_limit;

    if !limits.enabled {
        info!("Rate limiting disabled");
        return None;
    }

    let Some(url) = limits.redis_url() else {
        info!(
            max_requests = limits.max_requests,
            window_secs = limits.window_secs,
            "Rate limiting with in-process counters"
        );
        return Some(Arc::new(InMemoryVolumeLimiter::new(limits.window())));
    };

    let redis_config = RedisLimiterConfig::new(url).with_key_prefix(limits.key_prefix.clone());

    match RedisVolumeLimiter::connect(redis_config, limits.window()).await {
        Ok(limiter) => {
            info!(
                max_requests = limits.max_requests,
                window_secs = limits.window_secs,
                "Rate limiting with Redis"
            );
            Some(Arc::new(limiter))
        }
        Err(e) => {
            warn!(error = %e, "Redis unavailable, rate limiting disabled");
            None
        }
    }
}
