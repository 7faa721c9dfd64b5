//! API key generation
//!
//! Produces opaque, URL-safe keys from a cryptographically secure source.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;

/// Default prefix for issued keys
pub const DEFAULT_KEY_PREFIX: &str = "sk_";

/// Generator for opaque API keys
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    /// Prefix for all generated keys
    prefix: String,
    /// Number of random bytes per key
    key_bytes: usize,
}

impl KeyGenerator {
    /// Create a generator with the given prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            key_bytes: 32,
        }
    }

    /// Set the number of random bytes
    pub fn with_key_bytes(mut self, bytes: usize) -> Self {
        self.key_bytes = bytes;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Generate a new key
    pub fn generate(&self) -> String {
        let mut random_bytes = vec![0u8; self.key_bytes];
        rand::thread_rng().fill_bytes(&mut random_bytes);

        format!("{}{}", self.prefix, URL_SAFE_NO_PAD.encode(&random_bytes))
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::validate_api_key_format;
    use std::collections::HashSet;

    #[test]
    fn test_generate_key() {
        let key = KeyGenerator::default().generate();

        assert!(key.starts_with("sk_"));
        // 32 bytes base64-encoded = 43 chars, plus prefix
        assert_eq!(key.len(), "sk_".len() + 43);
    }

    #[test]
    fn test_generated_keys_are_well_formed() {
        let key = KeyGenerator::default().generate();

        assert!(validate_api_key_format(&key).is_ok());
        assert!(key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    }

    #[test]
    fn test_custom_prefix() {
        let generator = KeyGenerator::new("blog_");
        assert_eq!(generator.prefix(), "blog_");
        assert!(generator.generate().starts_with("blog_"));
    }

    #[test]
    fn test_empty_prefix() {
        let key = KeyGenerator::new("").generate();
        assert_eq!(key.len(), 43);
    }

    #[test]
    fn test_key_uniqueness() {
        let generator = KeyGenerator::default();
        let keys: HashSet<String> = (0..1000).map(|_| generator.generate()).collect();

        assert_eq!(keys.len(), 1000);
    }

    #[test]
    fn test_custom_key_bytes() {
        let key = KeyGenerator::default().with_key_bytes(64).generate();

        // 64 bytes base64-encoded = 86 chars, plus prefix
        assert_eq!(key.len(), "sk_".len() + 86);
    }
}
