//! Infrastructure layer - External service implementations

pub mod api_key;
pub mod llm;
pub mod logging;
pub mod rate_limit;
pub mod storage;
