//! Domain layer - Core business logic and entities

pub mod api_key;
pub mod auth;
pub mod clock;
pub mod content;
pub mod error;
pub mod rate_limit;

pub use api_key::{AccessTier, ApiKeyRecord, KeyStore, KeyTier};
pub use auth::{AdminPrincipal, AuthorizationError, AuthorizationPolicy, TrialRules};
pub use clock::{Clock, ManualClock, SystemClock};
pub use content::{BlogPost, BlogRequest, ContentGenerator};
pub use error::DomainError;
pub use rate_limit::{FixedWindow, RateLimitDecision, VolumeLimiter};
