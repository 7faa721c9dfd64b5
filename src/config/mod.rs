//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, AuthConfig, DatabaseConfig, LogFormat, LoggingConfig, OpenAiConfig,
    RateLimitConfig, ServerConfig, MAX_TRIAL_DAYS,
};
