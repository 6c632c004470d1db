//! In-memory grant repository for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use carebridge_application::GrantRepository;
use carebridge_core::{AppError, AppResult};
use carebridge_domain::{ApplicationId, BeneficiaryId, DataAccessGrant, GrantId};

#[cfg(test)]
mod tests;

/// In-memory grant repository implementation.
///
/// Mirrors the store-level unique constraint on (beneficiary, application)
/// so the duplicate-insert recovery path behaves the same as against
/// PostgreSQL.
#[derive(Debug, Default)]
pub struct InMemoryGrantRepository {
    grants: RwLock<HashMap<GrantId, DataAccessGrant>>,
}

impl InMemoryGrantRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            grants: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl GrantRepository for InMemoryGrantRepository {
    async fn insert(&self, grant: &DataAccessGrant) -> AppResult<()> {
        let mut grants = self.grants.write().await;

        let pair_taken = grants.values().any(|existing| {
            existing.beneficiary_id == grant.beneficiary_id
                && existing.application_id == grant.application_id
        });
        if pair_taken {
            return Err(AppError::DuplicateGrant(format!(
                "grant already exists for beneficiary {} and application {}",
                grant.beneficiary_id, grant.application_id
            )));
        }

        grants.insert(grant.id, grant.clone());
        Ok(())
    }

    async fn find(
        &self,
        beneficiary_id: BeneficiaryId,
        application_id: ApplicationId,
    ) -> AppResult<Option<DataAccessGrant>> {
        Ok(self
            .grants
            .read()
            .await
            .values()
            .find(|grant| {
                grant.beneficiary_id == beneficiary_id && grant.application_id == application_id
            })
            .cloned())
    }

    async fn delete(&self, id: GrantId) -> AppResult<Option<DataAccessGrant>> {
        Ok(self.grants.write().await.remove(&id))
    }

    async fn list_missing_expiration(
        &self,
        application_id: ApplicationId,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<DataAccessGrant>> {
        let grants = self.grants.read().await;

        let mut listed: Vec<DataAccessGrant> = grants
            .values()
            .filter(|grant| {
                grant.application_id == application_id
                    && grant.expiration_date.is_none()
                    && grant.created_at >= begin
                    && grant.created_at <= end
            })
            .cloned()
            .collect();
        listed.sort_by_key(|grant| grant.created_at);

        Ok(listed)
    }

    async fn set_expiration(&self, id: GrantId, expiration: DateTime<Utc>) -> AppResult<()> {
        let mut grants = self.grants.write().await;

        let grant = grants
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("grant {id}")))?;
        grant.expiration_date = Some(expiration);

        Ok(())
    }
}
