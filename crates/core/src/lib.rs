//! Shared primitives for all Rust crates in Carebridge.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Result type used across Carebridge crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
///
/// Variants split into three families the caller must treat differently:
/// domain outcomes the protocol layer maps to user-facing responses
/// (`NotFound`, `Expired`, `Inactive`, `ScopeExhausted`), locally recovered
/// races (`DuplicateGrant`), and fatal data-integrity violations that must
/// abort the surrounding flow (`IdentityConflict`, `ImmutableField`).
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Access window for a grant or application has lapsed.
    ///
    /// Distinct from [`AppError::NotFound`]: the grant once existed validly.
    #[error("expired: {0}")]
    Expired(String),

    /// Application is administratively disabled, independent of expiration.
    #[error("application inactive: {0}")]
    Inactive(String),

    /// Scope reconciliation produced an empty granted-scope set.
    ///
    /// The implicit full revoke has already executed when this surfaces.
    #[error("no scopes grantable: {0}")]
    ScopeExhausted(String),

    /// Resolved identity does not match the previously recorded identity.
    /// Fatal: never auto-merged, must abort the authentication flow.
    #[error("identity conflict: {0}")]
    IdentityConflict(String),

    /// Attempt to change an already-set identity field to a different value
    /// outside the explicit rotation path. Fatal.
    #[error("immutable field violation: {0}")]
    ImmutableField(String),

    /// Uniqueness race on grant creation. Recovered locally by returning
    /// the existing row; callers outside the grant service never see it.
    #[error("duplicate grant: {0}")]
    DuplicateGrant(String),

    /// Repair range is open, inverted, or reaches into the present/future.
    /// Rejected before any row is touched.
    #[error("invalid repair range: {0}")]
    RepairRange(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error is a data-integrity violation that must abort the
    /// surrounding flow rather than map to a routine domain response.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::IdentityConflict(_) | Self::ImmutableField(_))
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn identity_conflict_is_fatal() {
        assert!(AppError::IdentityConflict("mismatch".to_owned()).is_fatal());
    }

    #[test]
    fn immutable_field_is_fatal() {
        assert!(AppError::ImmutableField("hash already set".to_owned()).is_fatal());
    }

    #[test]
    fn domain_outcomes_are_not_fatal() {
        assert!(!AppError::NotFound("grant".to_owned()).is_fatal());
        assert!(!AppError::Expired("grant".to_owned()).is_fatal());
        assert!(!AppError::Inactive("app".to_owned()).is_fatal());
        assert!(!AppError::ScopeExhausted("empty".to_owned()).is_fatal());
        assert!(!AppError::DuplicateGrant("race".to_owned()).is_fatal());
    }
}
