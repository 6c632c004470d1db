//! Identity resolution: upstream claims to a durable crosswalk record.

use std::sync::Arc;

use chrono::Utc;

use carebridge_core::{AppError, AppResult};
use carebridge_domain::{
    ArchivedCrosswalk, AuthoritativeIdentity, BeneficiaryId, ChangedHashFields, Crosswalk,
    IdentityHash,
};

use crate::access_ports::ArchiveWriter;
use crate::identity_ports::{CrosswalkRepository, RecordLocator};

mod hashing;

pub use hashing::IdentityHasher;

/// Raw identity claims from the upstream identity provider's callback.
#[derive(Debug, Clone, Default)]
pub struct UpstreamClaims {
    /// Long-term claim number, as received.
    pub claim_number: Option<String>,
    /// Newer-format member identifier, as received.
    pub member_id: Option<String>,
}

/// Outcome of a resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The resolved crosswalk, reflecting any rotation applied.
    pub crosswalk: Crosswalk,
    /// Whether the crosswalk was created by this resolution.
    pub is_new: bool,
}

/// Canonicalizes an upstream claim string.
///
/// The single normalization point for "absent": upstream providers send
/// both missing fields and empty strings, and everything below this
/// boundary sees only `None` or a trimmed non-empty value.
#[must_use]
pub fn normalize_claim(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_owned)
}

/// Resolves upstream identity claims to crosswalk records.
#[derive(Clone)]
pub struct IdentityService {
    crosswalks: Arc<dyn CrosswalkRepository>,
    locator: Arc<dyn RecordLocator>,
    archive: Arc<dyn ArchiveWriter>,
    hasher: IdentityHasher,
}

impl IdentityService {
    /// Creates a new identity service.
    #[must_use]
    pub fn new(
        crosswalks: Arc<dyn CrosswalkRepository>,
        locator: Arc<dyn RecordLocator>,
        archive: Arc<dyn ArchiveWriter>,
        hasher: IdentityHasher,
    ) -> Self {
        Self {
            crosswalks,
            locator,
            archive,
            hasher,
        }
    }

    /// Resolves upstream claims to a crosswalk, creating one for a new
    /// beneficiary.
    ///
    /// Lookup order: claim-number hash, then member-id hash. A found row
    /// whose stored external record id differs from the freshly located one
    /// is a fatal [`AppError::IdentityConflict`]. Differing values in the
    /// hash the row was *not* matched by are legitimate upstream rotation:
    /// the pre-change row is snapshotted to the archive, the field is
    /// updated in place, and the change is logged with the affected
    /// field(s).
    ///
    /// The external records-system lookup happens before any write.
    pub async fn resolve(&self, claims: &UpstreamClaims) -> AppResult<Resolution> {
        let claim_number = normalize_claim(claims.claim_number.as_deref());
        let member_id = normalize_claim(claims.member_id.as_deref());

        if claim_number.is_none() && member_id.is_none() {
            return Err(AppError::Validation(
                "at least one upstream identity claim is required".to_owned(),
            ));
        }

        let claim_number_hash = claim_number
            .as_deref()
            .map(|value| self.hasher.hash_claim(value))
            .transpose()?;
        let member_id_hash = member_id
            .as_deref()
            .map(|value| self.hasher.hash_claim(value))
            .transpose()?;

        // External collaborator call, ahead of any write transaction.
        let located = self
            .locator
            .locate(claim_number_hash.as_ref(), member_id_hash.as_ref())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(
                    "no external record matches the presented identity".to_owned(),
                )
            })?;

        let found = self
            .lookup(claim_number_hash.as_ref(), member_id_hash.as_ref())
            .await?;

        match found {
            Some((crosswalk, matched_via)) => {
                if crosswalk.external_record_id != located {
                    return Err(AppError::IdentityConflict(format!(
                        "beneficiary {} resolved to external record '{located}' but \
                         crosswalk records '{}'",
                        crosswalk.beneficiary_id, crosswalk.external_record_id
                    )));
                }

                self.apply_identity(crosswalk, matched_via, claim_number_hash, member_id_hash)
                    .await
            }
            None => {
                let authoritative = if claim_number_hash.is_some() {
                    AuthoritativeIdentity::ClaimNumber
                } else {
                    AuthoritativeIdentity::MemberId
                };

                let crosswalk = Crosswalk {
                    beneficiary_id: BeneficiaryId::new(),
                    external_record_id: located,
                    claim_number_hash,
                    member_id_hash,
                    authoritative,
                    created_at: Utc::now(),
                };

                self.crosswalks.insert(&crosswalk).await?;
                tracing::info!(
                    beneficiary = %crosswalk.beneficiary_id,
                    authoritative = crosswalk.authoritative.as_str(),
                    "created crosswalk for new beneficiary",
                );

                Ok(Resolution {
                    crosswalk,
                    is_new: true,
                })
            }
        }
    }

    /// Deletes a beneficiary's crosswalk, snapshotting it first.
    ///
    /// Used by the beneficiary-deletion cascade. The snapshot is part of
    /// the identity audit trail and is written before the row goes away.
    pub async fn remove(&self, beneficiary_id: BeneficiaryId) -> AppResult<()> {
        let crosswalk = self
            .crosswalks
            .find_by_beneficiary(beneficiary_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("no crosswalk for beneficiary {beneficiary_id}"))
            })?;

        let snapshot = ArchivedCrosswalk::before_deletion(&crosswalk, Utc::now());
        self.archive.archive_crosswalk(&snapshot).await?;
        self.crosswalks.delete(beneficiary_id).await?;

        Ok(())
    }

    /// Read-only projection over real beneficiaries.
    pub async fn real_crosswalks(&self) -> AppResult<Vec<Crosswalk>> {
        self.crosswalks.list_real().await
    }

    /// Read-only projection over synthetic (test) beneficiaries.
    pub async fn synthetic_crosswalks(&self) -> AppResult<Vec<Crosswalk>> {
        self.crosswalks.list_synthetic().await
    }

    async fn lookup(
        &self,
        claim_number_hash: Option<&IdentityHash>,
        member_id_hash: Option<&IdentityHash>,
    ) -> AppResult<Option<(Crosswalk, AuthoritativeIdentity)>> {
        if let Some(hash) = claim_number_hash
            && let Some(crosswalk) = self.crosswalks.find_by_claim_number_hash(hash).await?
        {
            return Ok(Some((crosswalk, AuthoritativeIdentity::ClaimNumber)));
        }

        if let Some(hash) = member_id_hash
            && let Some(crosswalk) = self.crosswalks.find_by_member_id_hash(hash).await?
        {
            return Ok(Some((crosswalk, AuthoritativeIdentity::MemberId)));
        }

        Ok(None)
    }

    /// Applies presented hashes to a matched crosswalk.
    ///
    /// Null fields are filled under the write-once rule; already-set fields
    /// that differ go through the rotation path with an archive snapshot of
    /// the pre-change row.
    async fn apply_identity(
        &self,
        mut crosswalk: Crosswalk,
        matched_via: AuthoritativeIdentity,
        claim_number_hash: Option<IdentityHash>,
        member_id_hash: Option<IdentityHash>,
    ) -> AppResult<Resolution> {
        let before = crosswalk.clone();

        let mut filled = false;
        if crosswalk.claim_number_hash.is_none()
            && let Some(hash) = claim_number_hash.clone()
        {
            crosswalk.assign_claim_number_hash(hash)?;
            filled = true;
        }
        if crosswalk.member_id_hash.is_none()
            && let Some(hash) = member_id_hash.clone()
        {
            crosswalk.assign_member_id_hash(hash)?;
            filled = true;
        }

        // Rotation only considers fields that were already set and differ;
        // the match came through the other hash, so this is upstream drift,
        // not a conflict.
        let drifted_claim_number = claim_number_hash
            .filter(|hash| before.claim_number_hash.as_ref().is_some_and(|b| b != hash));
        let drifted_member_id = member_id_hash
            .filter(|hash| before.member_id_hash.as_ref().is_some_and(|b| b != hash));

        let changed: ChangedHashFields =
            crosswalk.rotate_hashes(drifted_claim_number, drifted_member_id);

        crosswalk.authoritative = matched_via;

        if changed.any() {
            let snapshot = ArchivedCrosswalk::before_rotation(&before, changed, Utc::now());
            self.archive.archive_crosswalk(&snapshot).await?;
            tracing::info!(
                beneficiary = %crosswalk.beneficiary_id,
                changed = changed.as_tag(),
                "rotated upstream identity hashes",
            );
        }

        if changed.any() || filled || before.authoritative != matched_via {
            self.crosswalks.update_identity(&crosswalk).await?;
        }

        Ok(Resolution {
            crosswalk,
            is_new: false,
        })
    }
}
