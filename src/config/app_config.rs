use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::auth::{
    AdminPrincipal, AuthorizationError, TrialRules, UnparsableIssuedAt, DEFAULT_TRIAL_DAYS,
    DEFAULT_TRIAL_QUOTA,
};
use crate::domain::rate_limit::FixedWindow;
use crate::infrastructure::api_key::{StoreAccessPolicy, DEFAULT_KEY_PREFIX};
use crate::infrastructure::llm::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};
use crate::infrastructure::storage::SqliteConfig;

/// Longest accepted trial window, in days
pub const MAX_TRIAL_DAYS: i64 = 3650;

/// Environment variables read by earlier deployments, mapped onto config keys
const LEGACY_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("ADMIN_API_KEY", "auth.admin_api_key"),
    ("OPENAI_API_KEY", "openai.api_key"),
    ("REDIS_URL", "rate_limit.redis_url"),
    ("DATABASE_URL", "database.url"),
];

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub openai: OpenAiConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub busy_timeout_ms: u64,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub admin_api_key: String,
    pub key_prefix: String,
    pub trial_quota: u32,
    pub trial_days: i64,
    pub unparsable_issued_at: UnparsableIssuedAt,
    pub store_timeout_ms: u64,
    pub store_attempts: u32,
    pub store_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// In-process counters when unset
    pub redis_url: Option<String>,
    pub max_requests: u32,
    pub window_secs: u64,
    pub key_prefix: String,
    pub timeout_ms: u64,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let sqlite = SqliteConfig::default();
        Self {
            url: sqlite.url,
            max_connections: sqlite.max_connections,
            acquire_timeout_secs: sqlite.acquire_timeout_secs,
            busy_timeout_ms: sqlite.busy_timeout_ms,
        }
    }
}

impl DatabaseConfig {
    pub fn sqlite(&self) -> SqliteConfig {
        SqliteConfig::new(self.url.clone())
            .with_max_connections(self.max_connections)
            .with_acquire_timeout(self.acquire_timeout_secs)
            .with_busy_timeout(self.busy_timeout_ms)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        let access = StoreAccessPolicy::default();
        Self {
            admin_api_key: String::new(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            trial_quota: DEFAULT_TRIAL_QUOTA,
            trial_days: DEFAULT_TRIAL_DAYS,
            unparsable_issued_at: UnparsableIssuedAt::default(),
            store_timeout_ms: access.timeout.as_millis() as u64,
            store_attempts: access.attempts,
            store_backoff_ms: access.backoff.as_millis() as u64,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_api_key", &"[REDACTED]")
            .field("key_prefix", &self.key_prefix)
            .field("trial_quota", &self.trial_quota)
            .field("trial_days", &self.trial_days)
            .field("unparsable_issued_at", &self.unparsable_issued_at)
            .field("store_timeout_ms", &self.store_timeout_ms)
            .field("store_attempts", &self.store_attempts)
            .field("store_backoff_ms", &self.store_backoff_ms)
            .finish()
    }
}

impl AuthConfig {
    pub fn admin_principal(&self) -> Result<AdminPrincipal, AuthorizationError> {
        AdminPrincipal::new(self.admin_api_key.clone())
    }

    pub fn trial_rules(&self) -> TrialRules {
        let window =
            chrono::Duration::try_days(self.trial_days).unwrap_or(chrono::Duration::MAX);
        TrialRules::new(self.trial_quota, window)
            .with_unparsable_issued_at(self.unparsable_issued_at)
    }

    pub fn store_access(&self) -> StoreAccessPolicy {
        StoreAccessPolicy {
            timeout: Duration::from_millis(self.store_timeout_ms),
            attempts: self.store_attempts,
            backoff: Duration::from_millis(self.store_backoff_ms),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let window = FixedWindow::default();
        Self {
            enabled: true,
            redis_url: None,
            max_requests: window.max_requests,
            window_secs: window.window.as_secs(),
            key_prefix: "ratelimit".to_string(),
            timeout_ms: 250,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> FixedWindow {
        FixedWindow::new(self.max_requests, Duration::from_secs(self.window_secs))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Redis URL, ignoring blank values
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            timeout_secs: 120,
        }
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load from config files, `APP__*` variables and the legacy variable names
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with(None, |name| std::env::var(name).ok())
    }

    /// Load with an explicit environment instead of the process environment
    pub fn load_from_env(env: HashMap<String, String>) -> Result<Self, config::ConfigError> {
        let legacy = env.clone();
        Self::load_with(Some(env), move |name| legacy.get(name).cloned())
    }

    fn load_with(
        env: Option<HashMap<String, String>>,
        legacy: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            );

        for (variable, key) in LEGACY_ENV_OVERRIDES {
            builder = builder.set_override_option(*key, legacy(variable))?;
        }

        builder.build()?.try_deserialize()
    }

    /// Reject settings no deployment can run with
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.auth.admin_api_key.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "auth.admin_api_key (or ADMIN_API_KEY) must be set".to_string(),
            ));
        }

        if self.auth.trial_quota == 0 {
            return Err(config::ConfigError::Message(
                "auth.trial_quota must be greater than zero".to_string(),
            ));
        }

        if !(1..=MAX_TRIAL_DAYS).contains(&self.auth.trial_days) {
            return Err(config::ConfigError::Message(format!(
                "auth.trial_days must be between 1 and {}",
                MAX_TRIAL_DAYS
            )));
        }

        if self.auth.store_timeout_ms == 0 {
            return Err(config::ConfigError::Message(
                "auth.store_timeout_ms must be greater than zero".to_string(),
            ));
        }

        let limits = &self.rate_limit;
        if limits.enabled && (limits.window_secs == 0 || limits.max_requests == 0) {
            return Err(config::ConfigError::Message(
                "rate_limit.window_secs and rate_limit.max_requests must be greater than zero"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
