//! Administrative principal

use super::error::AuthorizationError;

/// The single out-of-band admin secret
///
/// Never printed: `Debug` redacts the value.
#[derive(Clone)]
pub struct AdminPrincipal {
    secret: String,
}

impl AdminPrincipal {
    /// Wrap a configured secret. Empty secrets are rejected so that an
    /// empty presented key can never match.
    pub fn new(secret: impl Into<String>) -> Result<Self, AuthorizationError> {
        let secret = secret.into();

        if secret.trim().is_empty() {
            return Err(AuthorizationError::Internal(
                "admin API key must not be empty".to_string(),
            ));
        }

        Ok(Self { secret })
    }

    /// Exact match against a presented key, in constant time
    pub fn matches(&self, presented: &str) -> bool {
        constant_time_compare(&self.secret, presented)
    }
}

impl std::fmt::Debug for AdminPrincipal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminPrincipal")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
