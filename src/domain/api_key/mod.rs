//! API Key domain
//!
//! Issued key records, their tiers and the store they live in.

mod entity;
mod repository;
mod validation;

pub use entity::{AccessTier, ApiKeyRecord, KeyTier};
#[cfg(test)]
pub use repository::MockKeyStore;
pub use repository::KeyStore;
pub use validation::{validate_api_key_format, ApiKeyValidationError};
