//! Crosswalk: durable mapping from internal beneficiary identity to
//! upstream identity hashes and the external records-system identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use carebridge_core::{AppError, AppResult};

use crate::BeneficiaryId;

/// Identifier addressing a beneficiary's data in the external records
/// system.
///
/// A leading `-` marks a synthetic (test) identity; everything else is
/// real. The partition is total and disjoint over non-empty ids, which is
/// why emptiness is rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalRecordId(String);

impl ExternalRecordId {
    /// Creates a validated external record identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "external record id must not be empty".to_owned(),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Whether this identifier belongs to a synthetic (test) beneficiary.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.0.starts_with('-')
    }

    /// Whether this identifier belongs to a real beneficiary.
    #[must_use]
    pub fn is_real(&self) -> bool {
        !self.is_synthetic()
    }
}

impl std::fmt::Display for ExternalRecordId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Salted, keyed, one-way digest of an upstream identity claim.
///
/// Never reversible; used only for equality matching. Stored as 64
/// lowercase hex characters (HMAC-SHA256 output).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityHash(String);

impl IdentityHash {
    /// Creates a validated identity hash from its hex representation.
    pub fn from_hex(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();

        if value.len() != 64 || !value.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase())
        {
            return Err(AppError::Validation(
                "identity hash must be 64 lowercase hex characters".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Which upstream identity claim matched at the last resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthoritativeIdentity {
    /// The long-term claim number (legacy identifier).
    ClaimNumber,
    /// The newer-format member identifier.
    MemberId,
}

impl AuthoritativeIdentity {
    /// Returns the storage string for this identity type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClaimNumber => "claim_number",
            Self::MemberId => "member_id",
        }
    }

    /// Parses a storage string into an identity type.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "claim_number" => Ok(Self::ClaimNumber),
            "member_id" => Ok(Self::MemberId),
            _ => Err(AppError::Validation(format!(
                "unknown authoritative identity '{value}'"
            ))),
        }
    }
}

/// Which hash fields changed during an in-place identity rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedHashFields {
    /// The claim-number hash changed.
    pub claim_number: bool,
    /// The member-id hash changed.
    pub member_id: bool,
}

impl ChangedHashFields {
    /// Whether any field changed.
    #[must_use]
    pub fn any(&self) -> bool {
        self.claim_number || self.member_id
    }

    /// Audit tag naming the changed field(s).
    #[must_use]
    pub fn as_tag(&self) -> &'static str {
        match (self.claim_number, self.member_id) {
            (true, true) => "both",
            (true, false) => "claim_number",
            (false, true) => "member_id",
            (false, false) => "none",
        }
    }
}

/// One-to-one identity record for a beneficiary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crosswalk {
    /// Internal beneficiary this record belongs to.
    pub beneficiary_id: BeneficiaryId,
    /// External records-system identifier. Immutable once set.
    pub external_record_id: ExternalRecordId,
    /// Hash of the long-term claim number. Write-once outside rotation.
    pub claim_number_hash: Option<IdentityHash>,
    /// Hash of the newer-format member identifier. Write-once outside
    /// rotation; legitimately absent for beneficiaries never issued one.
    pub member_id_hash: Option<IdentityHash>,
    /// Which claim was authoritative at the last resolution.
    pub authoritative: AuthoritativeIdentity,
    /// When the crosswalk was created.
    pub created_at: DateTime<Utc>,
}

impl Crosswalk {
    /// Assigns the claim-number hash under the write-once rule.
    ///
    /// Null to value succeeds exactly once; re-assigning the same value is
    /// a no-op; assigning a different value fails. Identity rotation goes
    /// through [`Crosswalk::rotate_hashes`] instead.
    pub fn assign_claim_number_hash(&mut self, hash: IdentityHash) -> AppResult<()> {
        assign_once(
            &mut self.claim_number_hash,
            hash,
            self.beneficiary_id,
            "claim_number_hash",
        )
    }

    /// Assigns the member-id hash under the write-once rule.
    pub fn assign_member_id_hash(&mut self, hash: IdentityHash) -> AppResult<()> {
        assign_once(
            &mut self.member_id_hash,
            hash,
            self.beneficiary_id,
            "member_id_hash",
        )
    }

    /// Applies an upstream identity rotation in place.
    ///
    /// This is the only path allowed to replace a non-null hash with a
    /// different value. The caller is responsible for having verified the
    /// match via the other hash or the external record id, and for writing
    /// the [`ArchivedCrosswalk`] snapshot of the pre-change row first.
    /// Returns which fields actually changed.
    #[must_use]
    pub fn rotate_hashes(
        &mut self,
        claim_number_hash: Option<IdentityHash>,
        member_id_hash: Option<IdentityHash>,
    ) -> ChangedHashFields {
        let mut changed = ChangedHashFields::default();

        if let Some(hash) = claim_number_hash
            && self.claim_number_hash.as_ref() != Some(&hash)
        {
            self.claim_number_hash = Some(hash);
            changed.claim_number = true;
        }

        if let Some(hash) = member_id_hash
            && self.member_id_hash.as_ref() != Some(&hash)
        {
            self.member_id_hash = Some(hash);
            changed.member_id = true;
        }

        changed
    }
}

fn assign_once(
    field: &mut Option<IdentityHash>,
    hash: IdentityHash,
    beneficiary_id: BeneficiaryId,
    field_name: &str,
) -> AppResult<()> {
    match field {
        None => {
            *field = Some(hash);
            Ok(())
        }
        Some(existing) if *existing == hash => Ok(()),
        Some(_) => Err(AppError::ImmutableField(format!(
            "{field_name} already set for beneficiary {beneficiary_id}"
        ))),
    }
}

/// Append-only snapshot of a crosswalk before an in-place change or
/// deletion, tagged with which fields changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedCrosswalk {
    /// Beneficiary of the snapshotted crosswalk.
    pub beneficiary_id: BeneficiaryId,
    /// External record id at snapshot time.
    pub external_record_id: ExternalRecordId,
    /// Claim-number hash at snapshot time.
    pub claim_number_hash: Option<IdentityHash>,
    /// Member-id hash at snapshot time.
    pub member_id_hash: Option<IdentityHash>,
    /// Authoritative identity at snapshot time.
    pub authoritative: AuthoritativeIdentity,
    /// Audit tag naming what changed (`claim_number`, `member_id`, `both`,
    /// or `deleted`).
    pub change_tag: String,
    /// When the snapshot was written.
    pub archived_at: DateTime<Utc>,
}

impl ArchivedCrosswalk {
    /// Snapshots a crosswalk ahead of an in-place hash rotation.
    #[must_use]
    pub fn before_rotation(
        crosswalk: &Crosswalk,
        changed: ChangedHashFields,
        archived_at: DateTime<Utc>,
    ) -> Self {
        Self::snapshot(crosswalk, changed.as_tag().to_owned(), archived_at)
    }

    /// Snapshots a crosswalk being deleted.
    #[must_use]
    pub fn before_deletion(crosswalk: &Crosswalk, archived_at: DateTime<Utc>) -> Self {
        Self::snapshot(crosswalk, "deleted".to_owned(), archived_at)
    }

    fn snapshot(crosswalk: &Crosswalk, change_tag: String, archived_at: DateTime<Utc>) -> Self {
        Self {
            beneficiary_id: crosswalk.beneficiary_id,
            external_record_id: crosswalk.external_record_id.clone(),
            claim_number_hash: crosswalk.claim_number_hash.clone(),
            member_id_hash: crosswalk.member_id_hash.clone(),
            authoritative: crosswalk.authoritative,
            change_tag,
            archived_at,
        }
    }
}
