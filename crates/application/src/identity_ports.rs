//! Ports for crosswalk persistence and external record lookup.

use async_trait::async_trait;

use carebridge_core::AppResult;
use carebridge_domain::{BeneficiaryId, Crosswalk, ExternalRecordId, IdentityHash};

/// Repository port for crosswalk records.
#[async_trait]
pub trait CrosswalkRepository: Send + Sync {
    /// Finds a crosswalk by the claim-number hash.
    async fn find_by_claim_number_hash(
        &self,
        hash: &IdentityHash,
    ) -> AppResult<Option<Crosswalk>>;

    /// Finds a crosswalk by the member-id hash.
    async fn find_by_member_id_hash(&self, hash: &IdentityHash) -> AppResult<Option<Crosswalk>>;

    /// Finds the crosswalk of a beneficiary.
    async fn find_by_beneficiary(
        &self,
        beneficiary_id: BeneficiaryId,
    ) -> AppResult<Option<Crosswalk>>;

    /// Inserts a new crosswalk.
    async fn insert(&self, crosswalk: &Crosswalk) -> AppResult<()>;

    /// Persists rotated hash fields and the authoritative identity of an
    /// existing row. The external record id is never updated.
    async fn update_identity(&self, crosswalk: &Crosswalk) -> AppResult<()>;

    /// Deletes a crosswalk and returns the deleted row, if it existed.
    async fn delete(&self, beneficiary_id: BeneficiaryId) -> AppResult<Option<Crosswalk>>;

    /// Read-only projection of crosswalks with real external record ids.
    async fn list_real(&self) -> AppResult<Vec<Crosswalk>>;

    /// Read-only projection of crosswalks with synthetic external record
    /// ids. Together with [`CrosswalkRepository::list_real`] this partitions
    /// the store: total and disjoint, no row in both.
    async fn list_synthetic(&self) -> AppResult<Vec<Crosswalk>>;
}

/// External records-system lookup.
///
/// Called before any write transaction is opened; implementations perform a
/// network search of the records system by hashed identity.
#[async_trait]
pub trait RecordLocator: Send + Sync {
    /// Resolves hashed identity claims to the external record id, or `None`
    /// when the records system holds no matching record.
    async fn locate(
        &self,
        claim_number_hash: Option<&IdentityHash>,
        member_id_hash: Option<&IdentityHash>,
    ) -> AppResult<Option<ExternalRecordId>>;
}
