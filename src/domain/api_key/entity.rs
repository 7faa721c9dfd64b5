//! API key record and tier types

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::validation::ApiKeyValidationError;

/// Tier an issued key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyTier {
    /// Time-boxed, metered evaluation key
    Trial,
    /// Unmetered key without expiry
    Paid,
}

impl KeyTier {
    /// Stored representation, matching the `user_type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Paid => "paid",
        }
    }
}

impl FromStr for KeyTier {
    type Err = ApiKeyValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trial" => Ok(Self::Trial),
            "paid" => Ok(Self::Paid),
            other => Err(ApiKeyValidationError::UnknownTier(other.to_string())),
        }
    }
}

impl std::fmt::Display for KeyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    Admin,
    Paid,
    Trial,
}

impl From<KeyTier> for AccessTier {
    fn from(tier: KeyTier) -> Self {
        match tier {
            KeyTier::Trial => Self::Trial,
            KeyTier::Paid => Self::Paid,
        }
    }
}

impl std::fmt::Display for AccessTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Paid => write!(f, "paid"),
            Self::Trial => write!(f, "trial"),
        }
    }
}

/// A persisted API key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    key: String,
    tier: KeyTier,
    /// `None` when the stored timestamp could not be parsed
    issued_at: Option<DateTime<Utc>>,
    usage_count: u32,
}

impl ApiKeyRecord {
    /// Create a freshly issued record with no usage
    pub fn new(key: impl Into<String>, tier: KeyTier, issued_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            tier,
            issued_at: Some(issued_at),
            usage_count: 0,
        }
    }

    /// Rebuild a record from storage
    pub fn from_parts(
        key: impl Into<String>,
        tier: KeyTier,
        issued_at: Option<DateTime<Utc>>,
        usage_count: u32,
    ) -> Self {
        Self {
            key: key.into(),
            tier,
            issued_at,
            usage_count,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn tier(&self) -> KeyTier {
        self.tier
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    pub fn usage_count(&self) -> u32 {
        self.usage_count
    }

    /// End of the trial window for a key issued at `issued_at`
    ///
    /// `None` when the issuance time is unknown or the end falls outside the
    /// representable range.
    pub fn expires_at(&self, window: Duration) -> Option<DateTime<Utc>> {
        self.issued_at
            .and_then(|issued| issued.checked_add_signed(window))
    }

    /// Record one metered call. The counter never decreases.
    pub fn record_usage(&mut self) -> u32 {
        self.usage_count = self.usage_count.saturating_add(1);
        self.usage_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parsing() {
        assert_eq!("trial".parse::<KeyTier>().unwrap(), KeyTier::Trial);
        assert_eq!("PAID".parse::<KeyTier>().unwrap(), KeyTier::Paid);
        assert_eq!(" Trial ".parse::<KeyTier>().unwrap(), KeyTier::Trial);
        assert!("admin".parse::<KeyTier>().is_err());
        assert!("".parse::<KeyTier>().is_err());
    }

    #[test]
    fn test_tier_display_round_trips_storage_value() {
        assert_eq!(KeyTier::Trial.to_string(), "trial");
        assert_eq!(KeyTier::Paid.as_str(), "paid");
    }

    #[test]
    fn test_access_tier_from_key_tier() {
        assert_eq!(AccessTier::from(KeyTier::Trial), AccessTier::Trial);
        assert_eq!(AccessTier::from(KeyTier::Paid), AccessTier::Paid);
        assert_eq!(
            serde_json::to_string(&AccessTier::Admin).unwrap(),
            "\"admin\""
        );
    }

    #[test]
    fn test_new_record_has_no_usage() {
        let now = Utc::now();
        let record = ApiKeyRecord::new("sk_abc", KeyTier::Trial, now);

        assert_eq!(record.key(), "sk_abc");
        assert_eq!(record.usage_count(), 0);
        assert_eq!(record.issued_at(), Some(now));
        assert_eq!(
            record.expires_at(Duration::days(7)),
            Some(now + Duration::days(7))
        );
    }

    #[test]
    fn test_record_usage_increments() {
        let mut record = ApiKeyRecord::new("sk_abc", KeyTier::Trial, Utc::now());

        assert_eq!(record.record_usage(), 1);
        assert_eq!(record.record_usage(), 2);
        assert_eq!(record.usage_count(), 2);
    }

    #[test]
    fn test_out_of_range_window_has_no_expiry() {
        let record = ApiKeyRecord::new("k", KeyTier::Trial, Utc::now());
        assert!(record.expires_at(Duration::MAX).is_none());
    }

    #[test]
    fn test_unparsable_timestamp_has_no_expiry() {
        let record = ApiKeyRecord::from_parts("k", KeyTier::Trial, None, 3);
        assert!(record.expires_at(Duration::days(7)).is_none());
    }
}
