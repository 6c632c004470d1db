//! Data-access-grant lifecycle: idempotent creation, the per-request access
//! gate, and revocation with its token/archive cascade.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use carebridge_core::{AppError, AppResult};
use carebridge_domain::{
    Application, ApplicationId, ArchivedDataAccessGrant, ArchivedToken, BeneficiaryId,
    DataAccessGrant, GrantId, PolicySwitches, TokenRecord, check_access, compute_expiration,
};

use crate::access_ports::{ArchiveWriter, GrantRepository, TokenStore};

#[cfg(test)]
mod tests;

/// Orchestrates the grant lifecycle.
#[derive(Clone)]
pub struct GrantService {
    grants: Arc<dyn GrantRepository>,
    tokens: Arc<dyn TokenStore>,
    archive: Arc<dyn ArchiveWriter>,
}

impl GrantService {
    /// Creates a new grant service.
    #[must_use]
    pub fn new(
        grants: Arc<dyn GrantRepository>,
        tokens: Arc<dyn TokenStore>,
        archive: Arc<dyn ArchiveWriter>,
    ) -> Self {
        Self {
            grants,
            tokens,
            archive,
        }
    }

    /// Get-or-create for the (beneficiary, application) grant. Idempotent.
    ///
    /// Concurrent token exchanges race on first authorization; the store's
    /// unique constraint decides the winner and the loser returns the
    /// winning row instead of erroring.
    pub async fn ensure_grant(
        &self,
        beneficiary_id: BeneficiaryId,
        application: &Application,
    ) -> AppResult<DataAccessGrant> {
        if let Some(existing) = self.grants.find(beneficiary_id, application.id).await? {
            return Ok(existing);
        }

        let created_at = Utc::now();
        let grant = DataAccessGrant {
            id: GrantId::new(),
            beneficiary_id,
            application_id: application.id,
            created_at,
            expiration_date: compute_expiration(application.access_type, created_at)?,
        };

        match self.grants.insert(&grant).await {
            Ok(()) => Ok(grant),
            Err(AppError::DuplicateGrant(_)) => self
                .grants
                .find(beneficiary_id, application.id)
                .await?
                .ok_or_else(|| {
                    AppError::Internal(format!(
                        "grant for beneficiary {beneficiary_id} and application {} \
                         vanished after duplicate insert",
                        application.id
                    ))
                }),
            Err(error) => Err(error),
        }
    }

    /// Per-request gate: the beneficiary must hold a live, unexpired grant
    /// for an active application. Returns the grant on success.
    pub async fn check_access(
        &self,
        application: &Application,
        beneficiary_id: BeneficiaryId,
        switches: PolicySwitches,
        now: DateTime<Utc>,
    ) -> AppResult<DataAccessGrant> {
        let grant = self
            .grants
            .find(beneficiary_id, application.id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "no grant for beneficiary {beneficiary_id} and application '{}'",
                    application.name
                ))
            })?;

        check_access(application, &grant, switches, now)?;
        Ok(grant)
    }

    /// Revokes the grant for a (beneficiary, application) pair.
    ///
    /// Cascade, in order: delete the grant, revoke every live token for the
    /// pair (archiving each), write exactly one archived grant preserving
    /// the original `beneficiary`, `application`, and `created_at`. The
    /// deletions are authoritative; archival is best-effort and a failure
    /// there is logged, never rolled back into the live state.
    pub async fn revoke(
        &self,
        beneficiary_id: BeneficiaryId,
        application_id: ApplicationId,
    ) -> AppResult<()> {
        let grant = self
            .grants
            .find(beneficiary_id, application_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "no grant for beneficiary {beneficiary_id} and application {application_id}"
                ))
            })?;

        let deleted = self.grants.delete(grant.id).await?.ok_or_else(|| {
            AppError::NotFound(format!("grant {} already deleted", grant.id))
        })?;

        self.revoke_tokens(beneficiary_id, application_id).await?;

        let archived = ArchivedDataAccessGrant::from_grant(&deleted, Utc::now());
        if let Err(error) = self.archive.archive_grant(&archived).await {
            tracing::warn!(
                grant = %deleted.id,
                beneficiary = %beneficiary_id,
                %error,
                "failed to archive revoked grant",
            );
        }

        Ok(())
    }

    /// Deletes every live token for a pair, archiving each deleted token.
    ///
    /// Returns the number of tokens revoked. Shared by grant revocation and
    /// scope reconciliation; the grant row is untouched.
    pub async fn revoke_tokens(
        &self,
        beneficiary_id: BeneficiaryId,
        application_id: ApplicationId,
    ) -> AppResult<usize> {
        let mut revoked = 0;

        for token in self.tokens.list_active(beneficiary_id, application_id).await? {
            if let Some(deleted) = self.tokens.delete(token.id).await? {
                revoked += 1;
                self.record_token_deletion(&deleted).await;
            }
        }

        Ok(revoked)
    }

    /// Writes the archive copy of a deleted token.
    ///
    /// Also the entry point for the protocol layer's own token deletions,
    /// which must archive through the same path. Best-effort: a failure is
    /// logged and does not undo the deletion.
    pub async fn record_token_deletion(&self, token: &TokenRecord) {
        let archived = ArchivedToken::from_token(token, Utc::now());
        if let Err(error) = self.archive.archive_token(&archived).await {
            tracing::warn!(
                token = %token.id,
                beneficiary = %token.beneficiary_id,
                %error,
                "failed to archive deleted token",
            );
        }
    }
}
