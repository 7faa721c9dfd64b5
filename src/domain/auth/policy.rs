//! Authorization policy
//!
//! Pure decision logic: given a presented key, the stored record (if any)
//! and the current time, decide which tier the caller gets. Metering is
//! reported back to the caller rather than performed here.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthorizationError;
use super::principal::AdminPrincipal;
use crate::domain::api_key::{AccessTier, ApiKeyRecord, KeyTier};

/// Default number of metered calls a trial key may make
pub const DEFAULT_TRIAL_QUOTA: u32 = 10;

/// Default trial window in days
pub const DEFAULT_TRIAL_DAYS: i64 = 7;

/// What to do with a trial key whose issuance timestamp cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnparsableIssuedAt {
    /// Deny the request as `TrialExpired`
    #[default]
    TreatAsExpired,
    /// Pretend the key was issued just now (legacy behavior)
    TreatAsNow,
}

/// Limits applied to trial keys
#[derive(Debug, Clone)]
pub struct TrialRules {
    pub quota: u32,
    pub window: Duration,
    pub unparsable_issued_at: UnparsableIssuedAt,
}

impl Default for TrialRules {
    fn default() -> Self {
        Self {
            quota: DEFAULT_TRIAL_QUOTA,
            window: Duration::days(DEFAULT_TRIAL_DAYS),
            unparsable_issued_at: UnparsableIssuedAt::default(),
        }
    }
}

impl TrialRules {
    pub fn new(quota: u32, window: Duration) -> Self {
        Self {
            quota,
            window,
            ..Default::default()
        }
    }

    pub fn with_unparsable_issued_at(mut self, policy: UnparsableIssuedAt) -> Self {
        self.unparsable_issued_at = policy;
        self
    }
}

/// A granted access level, plus whether the call must be metered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub tier: AccessTier,
    pub metered: bool,
}

impl Grant {
    fn unmetered(tier: AccessTier) -> Self {
        Self {
            tier,
            metered: false,
        }
    }
}

/// Maps presented keys and stored records to access decisions
#[derive(Debug, Clone)]
pub struct AuthorizationPolicy {
    admin: AdminPrincipal,
    trial: TrialRules,
}

impl AuthorizationPolicy {
    pub fn new(admin: AdminPrincipal, trial: TrialRules) -> Self {
        Self { admin, trial }
    }

    pub fn trial_rules(&self) -> &TrialRules {
        &self.trial
    }

    /// Admin bypass, checked before any store access
    pub fn is_admin(&self, presented: &str) -> bool {
        self.admin.matches(presented)
    }

    /// Decide on a non-admin key given its stored record
    pub fn evaluate(
        &self,
        record: Option<&ApiKeyRecord>,
        now: DateTime<Utc>,
    ) -> Result<Grant, AuthorizationError> {
        let record = record.ok_or(AuthorizationError::InvalidKey)?;

        match record.tier() {
            KeyTier::Paid => Ok(Grant::unmetered(AccessTier::Paid)),
            KeyTier::Trial => self.evaluate_trial(record, now),
        }
    }

    fn evaluate_trial(
        &self,
        record: &ApiKeyRecord,
        now: DateTime<Utc>,
    ) -> Result<Grant, AuthorizationError> {
        let expires_at = match (record.issued_at(), self.trial.unparsable_issued_at) {
            (Some(_), _) => record.expires_at(self.trial.window),
            (None, UnparsableIssuedAt::TreatAsNow) => now.checked_add_signed(self.trial.window),
            (None, UnparsableIssuedAt::TreatAsExpired) => {
                return Err(AuthorizationError::TrialExpired);
            }
        };

        // A window past the representable range never ends
        if expires_at.is_some_and(|end| now > end) {
            return Err(AuthorizationError::TrialExpired);
        }

        if record.usage_count() >= self.trial.quota {
            return Err(AuthorizationError::QuotaExceeded);
        }

        Ok(Grant {
            tier: AccessTier::Trial,
            metered: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AuthorizationPolicy {
        AuthorizationPolicy::new(
            AdminPrincipal::new("admin-secret").unwrap(),
            TrialRules::default(),
        )
    }

    fn trial(issued_at: Option<DateTime<Utc>>, usage: u32) -> ApiKeyRecord {
        ApiKeyRecord::from_parts("trial-key", KeyTier::Trial, issued_at, usage)
    }

    #[test]
    fn test_admin_detection() {
        let policy = policy();
        assert!(policy.is_admin("admin-secret"));
        assert!(!policy.is_admin("trial-key"));
    }

    #[test]
    fn test_missing_record_is_invalid() {
        assert_eq!(
            policy().evaluate(None, Utc::now()),
            Err(AuthorizationError::InvalidKey)
        );
    }

    #[test]
    fn test_paid_is_unmetered_and_never_expires() {
        let long_ago = Utc::now() - Duration::days(3650);
        let record = ApiKeyRecord::from_parts("paid-key", KeyTier::Paid, Some(long_ago), 5000);

        let grant = policy().evaluate(Some(&record), Utc::now()).unwrap();
        assert_eq!(grant, Grant::unmetered(AccessTier::Paid));
    }

    #[test]
    fn test_paid_with_unparsable_timestamp_still_allowed() {
        let record = ApiKeyRecord::from_parts("paid-key", KeyTier::Paid, None, 0);
        assert!(policy().evaluate(Some(&record), Utc::now()).is_ok());
    }

    #[test]
    fn test_fresh_trial_is_metered() {
        let now = Utc::now();
        let grant = policy().evaluate(Some(&trial(Some(now), 0)), now).unwrap();

        assert_eq!(grant.tier, AccessTier::Trial);
        assert!(grant.metered);
    }

    #[test]
    fn test_trial_last_allowed_call() {
        let now = Utc::now();
        assert!(policy().evaluate(Some(&trial(Some(now), 9)), now).is_ok());
    }

    #[test]
    fn test_trial_quota_exceeded() {
        let now = Utc::now();
        assert_eq!(
            policy().evaluate(Some(&trial(Some(now), 10)), now),
            Err(AuthorizationError::QuotaExceeded)
        );
    }

    #[test]
    fn test_trial_expiry_boundary() {
        let issued = Utc::now();
        let record = trial(Some(issued), 0);

        let at_expiry = issued + Duration::days(7);
        assert!(policy().evaluate(Some(&record), at_expiry).is_ok());

        let after = at_expiry + Duration::seconds(1);
        assert_eq!(
            policy().evaluate(Some(&record), after),
            Err(AuthorizationError::TrialExpired)
        );
    }

    #[test]
    fn test_expiry_checked_before_quota() {
        let issued = Utc::now() - Duration::days(8);
        assert_eq!(
            policy().evaluate(Some(&trial(Some(issued), 10)), Utc::now()),
            Err(AuthorizationError::TrialExpired)
        );
    }

    #[test]
    fn test_unparsable_timestamp_fails_closed_by_default() {
        assert_eq!(
            policy().evaluate(Some(&trial(None, 0)), Utc::now()),
            Err(AuthorizationError::TrialExpired)
        );
    }

    #[test]
    fn test_unparsable_timestamp_treated_as_now() {
        let policy = AuthorizationPolicy::new(
            AdminPrincipal::new("admin-secret").unwrap(),
            TrialRules::default().with_unparsable_issued_at(UnparsableIssuedAt::TreatAsNow),
        );

        assert!(policy.evaluate(Some(&trial(None, 0)), Utc::now()).is_ok());
        assert_eq!(
            policy.evaluate(Some(&trial(None, 10)), Utc::now()),
            Err(AuthorizationError::QuotaExceeded)
        );
    }

    #[test]
    fn test_window_past_representable_range_never_expires() {
        let policy = AuthorizationPolicy::new(
            AdminPrincipal::new("admin-secret").unwrap(),
            TrialRules::new(10, Duration::days(100_000_000)),
        );
        let now = Utc::now();

        let grant = policy.evaluate(Some(&trial(Some(now), 0)), now).unwrap();
        assert!(grant.metered);

        let lenient = AuthorizationPolicy::new(
            AdminPrincipal::new("admin-secret").unwrap(),
            TrialRules::new(10, Duration::MAX)
                .with_unparsable_issued_at(UnparsableIssuedAt::TreatAsNow),
        );
        assert!(lenient.evaluate(Some(&trial(None, 0)), now).is_ok());
    }

    #[test]
    fn test_custom_rules() {
        let policy = AuthorizationPolicy::new(
            AdminPrincipal::new("admin-secret").unwrap(),
            TrialRules::new(3, Duration::hours(1)),
        );
        let now = Utc::now();

        assert!(policy.evaluate(Some(&trial(Some(now), 2)), now).is_ok());
        assert_eq!(
            policy.evaluate(Some(&trial(Some(now), 3)), now),
            Err(AuthorizationError::QuotaExceeded)
        );
        assert_eq!(
            policy.evaluate(Some(&trial(Some(now), 0)), now + Duration::minutes(61)),
            Err(AuthorizationError::TrialExpired)
        );
    }
}
