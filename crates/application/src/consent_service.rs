//! Token reconciliation on consent changes.
//!
//! Two triggers: a re-authorization with a different demographic-sharing
//! choice, and an authorization whose final scope set comes up empty. The
//! first revokes stale tokens and leaves the grant alone; the second is an
//! implicit full revoke of the grant and everything under it.

use std::sync::Arc;

use carebridge_core::{AppError, AppResult};
use carebridge_domain::{Application, BeneficiaryId, ScopePolicy, ScopeSet, TokenKind};

use crate::access_ports::TokenStore;
use crate::grant_service::GrantService;


/// Reconciles granted scopes and previously issued tokens.
#[derive(Clone)]
pub struct ConsentService {
    grant_service: GrantService,
    tokens: Arc<dyn TokenStore>,
    scope_policy: ScopePolicy,
}

impl ConsentService {
    /// Creates a new consent service.
    #[must_use]
    pub fn new(
        grant_service: GrantService,
        tokens: Arc<dyn TokenStore>,
        scope_policy: ScopePolicy,
    ) -> Self {
        Self {
            grant_service,
            tokens,
            scope_policy,
        }
    }

    /// Computes the granted scope set for an authorization and reconciles
    /// previously issued tokens against it.
    ///
    /// `requested` arrives already narrowed to the application's registered
    /// scopes by the protocol layer. Demographic scopes are stripped when
    /// the beneficiary declines sharing or the application does not request
    /// demographic data.
    ///
    /// An empty result is an implicit full revoke: the grant is deleted
    /// (cascading token revocation and archival) and
    /// [`AppError::ScopeExhausted`] surfaces after that cascade completes.
    /// A non-empty result that differs from a live access token's scopes
    /// revokes and archives the stale tokens; the grant row is untouched,
    /// so at most one access token per pair survives re-authorization.
    pub async fn reconcile_scopes(
        &self,
        beneficiary_id: BeneficiaryId,
        application: &Application,
        requested: &ScopeSet,
        shares_demographic: bool,
    ) -> AppResult<ScopeSet> {
        let allow_demographic = shares_demographic && application.requires_demographic_scopes;
        let granted = self.scope_policy.grantable(requested, allow_demographic);

        if granted.is_empty() {
            match self.grant_service.revoke(beneficiary_id, application.id).await {
                // Nothing to revoke is fine: the beneficiary may decline on
                // first contact, before any grant exists.
                Ok(()) | Err(AppError::NotFound(_)) => {}
                Err(error) => return Err(error),
            }

            return Err(AppError::ScopeExhausted(format!(
                "no scopes grantable to application '{}' for beneficiary {beneficiary_id}",
                application.name
            )));
        }

        let live = self
            .tokens
            .list_active(beneficiary_id, application.id)
            .await?;
        let stale = live
            .iter()
            .any(|token| token.kind == TokenKind::Access && token.scopes != granted);

        if stale {
            let revoked = self
                .grant_service
                .revoke_tokens(beneficiary_id, application.id)
                .await?;
            tracing::info!(
                beneficiary = %beneficiary_id,
                application = %application.id,
                revoked,
                "revoked stale tokens after consent change",
            );
        }

        Ok(granted)
    }
}
