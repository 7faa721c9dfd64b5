//! Authorization domain
//!
//! Turns a presented key into an access tier or a denial reason.

mod error;
mod policy;
mod principal;

pub use error::AuthorizationError;
pub use policy::{
    AuthorizationPolicy, Grant, TrialRules, UnparsableIssuedAt, DEFAULT_TRIAL_DAYS,
    DEFAULT_TRIAL_QUOTA,
};
pub use principal::AdminPrincipal;
