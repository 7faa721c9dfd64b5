//! API key validation utilities

use thiserror::Error;

/// Errors that can occur during API key validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiKeyValidationError {
    #[error("API key cannot be empty")]
    Empty,

    #[error("API key exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("API key contains invalid character: {0:?}")]
    InvalidCharacter(char),

    #[error("Unknown key tier '{0}'. Expected 'trial' or 'paid'")]
    UnknownTier(String),
}

const MAX_API_KEY_LENGTH: usize = 256;

/// Validate the shape of a presented API key before it reaches the store
///
/// Rules:
/// - Cannot be empty
/// - Maximum 256 characters
/// - Visible ASCII only (no whitespace or control characters)
///
/// Legacy UUID keys and generated `prefix_base64url` keys both pass.
pub fn validate_api_key_format(key: &str) -> Result<(), ApiKeyValidationError> {
    if key.is_empty() {
        return Err(ApiKeyValidationError::Empty);
    }

    if key.len() > MAX_API_KEY_LENGTH {
        return Err(ApiKeyValidationError::TooLong(MAX_API_KEY_LENGTH));
    }

    if let Some(c) = key.chars().find(|c| !c.is_ascii_graphic()) {
        return Err(ApiKeyValidationError::InvalidCharacter(c));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_keys() {
        assert!(validate_api_key_format("sk_Zm9vYmFyYmF6").is_ok());
        assert!(validate_api_key_format("3f2b6c1e-8a4d-4c7e-9b1a-0d2e3f4a5b6c").is_ok());
        assert!(validate_api_key_format("a").is_ok());
    }

    #[test]
    fn test_empty_key() {
        assert_eq!(validate_api_key_format(""), Err(ApiKeyValidationError::Empty));
    }

    #[test]
    fn test_too_long_key() {
        let long_key = "a".repeat(257);
        assert_eq!(
            validate_api_key_format(&long_key),
            Err(ApiKeyValidationError::TooLong(256))
        );
        assert!(validate_api_key_format(&"a".repeat(256)).is_ok());
    }

    #[test]
    fn test_invalid_characters() {
        assert_eq!(
            validate_api_key_format("my key"),
            Err(ApiKeyValidationError::InvalidCharacter(' '))
        );
        assert_eq!(
            validate_api_key_format("key\n"),
            Err(ApiKeyValidationError::InvalidCharacter('\n'))
        );
        assert!(matches!(
            validate_api_key_format("clé"),
            Err(ApiKeyValidationError::InvalidCharacter('é'))
        ));
    }
}
