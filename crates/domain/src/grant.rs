//! Data-access grants and their archived copies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApplicationId, BeneficiaryId};

/// Unique identifier for a data-access grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantId(Uuid);

impl GrantId {
    /// Creates a new random grant identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a grant identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for GrantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GrantId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A beneficiary's authorization of one application.
///
/// At most one live grant exists per (beneficiary, application) pair; the
/// store's unique constraint is the source of truth for that invariant, not
/// application logic, because grant creation races under concurrent token
/// exchanges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataAccessGrant {
    /// Grant identifier.
    pub id: GrantId,
    /// Beneficiary who authorized access.
    pub beneficiary_id: BeneficiaryId,
    /// Authorized application.
    pub application_id: ApplicationId,
    /// First successful authorization timestamp.
    pub created_at: DateTime<Utc>,
    /// Dated expiry, set by the expiration policy; `None` for access types
    /// without one, or on pre-policy rows awaiting repair.
    pub expiration_date: Option<DateTime<Utc>>,
}

/// Append-only copy of a deleted grant.
///
/// Written exactly once per deletion; never updated or deleted afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedDataAccessGrant {
    /// Identifier of the deleted grant.
    pub grant_id: GrantId,
    /// Beneficiary of the deleted grant.
    pub beneficiary_id: BeneficiaryId,
    /// Application of the deleted grant.
    pub application_id: ApplicationId,
    /// Original creation timestamp, preserved verbatim.
    pub created_at: DateTime<Utc>,
    /// Expiration the grant carried when deleted.
    pub expiration_date: Option<DateTime<Utc>>,
    /// When the archive copy was written.
    pub archived_at: DateTime<Utc>,
}

impl ArchivedDataAccessGrant {
    /// Builds the archive copy of a grant being deleted.
    #[must_use]
    pub fn from_grant(grant: &DataAccessGrant, archived_at: DateTime<Utc>) -> Self {
        Self {
            grant_id: grant.id,
            beneficiary_id: grant.beneficiary_id,
            application_id: grant.application_id,
            created_at: grant.created_at,
            expiration_date: grant.expiration_date,
            archived_at,
        }
    }
}
