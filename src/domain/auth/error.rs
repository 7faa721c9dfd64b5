use thiserror::Error;

/// Reasons an authorization or issuance request is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("Invalid API Key")]
    InvalidKey,

    #[error("Trial period expired")]
    TrialExpired,

    #[error("Trial request limit reached")]
    QuotaExceeded,

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Invalid tier '{0}'. Expected 'trial' or 'paid'")]
    InvalidTier(String),

    #[error("Key store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthorizationError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidKey => "invalid_key",
            Self::TrialExpired => "trial_expired",
            Self::QuotaExceeded => "quota_exceeded",
            Self::Unauthorized => "unauthorized",
            Self::InvalidTier(_) => "invalid_tier",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Whether the caller may retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}
