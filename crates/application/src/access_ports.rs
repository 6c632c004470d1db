//! Ports for grant, application, token, and archival persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use carebridge_core::AppResult;
use carebridge_domain::{
    Application, ApplicationId, ArchivedCrosswalk, ArchivedDataAccessGrant, ArchivedToken,
    BeneficiaryId, DataAccessGrant, GrantId, TokenId, TokenRecord,
};

/// Repository port for live data-access grants.
#[async_trait]
pub trait GrantRepository: Send + Sync {
    /// Inserts a new grant.
    ///
    /// The store's unique constraint on (beneficiary, application) is the
    /// source of truth for the one-grant-per-pair invariant; a violation
    /// maps to [`carebridge_core::AppError::DuplicateGrant`] so the service
    /// can recover by returning the winning row.
    async fn insert(&self, grant: &DataAccessGrant) -> AppResult<()>;

    /// Finds the live grant for a (beneficiary, application) pair.
    async fn find(
        &self,
        beneficiary_id: BeneficiaryId,
        application_id: ApplicationId,
    ) -> AppResult<Option<DataAccessGrant>>;

    /// Deletes a grant and returns the deleted row, if it existed.
    async fn delete(&self, id: GrantId) -> AppResult<Option<DataAccessGrant>>;

    /// Lists grants of an application created within `[begin, end]` whose
    /// expiration date is null. Used by repair tooling.
    async fn list_missing_expiration(
        &self,
        application_id: ApplicationId,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<DataAccessGrant>>;

    /// Sets the expiration date of a grant.
    async fn set_expiration(&self, id: GrantId, expiration: DateTime<Utc>) -> AppResult<()>;
}

/// Read-only port for registered applications.
///
/// Application management itself belongs to the external protocol layer.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Finds an application by id.
    async fn find_by_id(&self, id: ApplicationId) -> AppResult<Option<Application>>;

    /// Finds an application by its registered name.
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Application>>;
}

/// Port onto the protocol layer's token store.
///
/// Issuance and encoding stay external; this core only enumerates and
/// deletes tokens during reconciliation and revocation cascades.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Lists live tokens for a (beneficiary, application) pair.
    async fn list_active(
        &self,
        beneficiary_id: BeneficiaryId,
        application_id: ApplicationId,
    ) -> AppResult<Vec<TokenRecord>>;

    /// Deletes a token and returns the deleted record, if it existed.
    async fn delete(&self, id: TokenId) -> AppResult<Option<TokenRecord>>;
}

/// Append-only archival port.
///
/// Rows written here are never updated or deleted by normal flow.
#[async_trait]
pub trait ArchiveWriter: Send + Sync {
    /// Appends the archive copy of a deleted grant.
    async fn archive_grant(&self, archived: &ArchivedDataAccessGrant) -> AppResult<()>;

    /// Appends the archive copy of a deleted token.
    async fn archive_token(&self, archived: &ArchivedToken) -> AppResult<()>;

    /// Appends a crosswalk snapshot.
    async fn archive_crosswalk(&self, archived: &ArchivedCrosswalk) -> AppResult<()>;
}
