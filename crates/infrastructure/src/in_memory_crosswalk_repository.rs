//! In-memory crosswalk repository for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use carebridge_application::CrosswalkRepository;
use carebridge_core::{AppError, AppResult};
use carebridge_domain::{BeneficiaryId, Crosswalk, IdentityHash};


/// In-memory crosswalk repository implementation.
#[derive(Debug, Default)]
pub struct InMemoryCrosswalkRepository {
    crosswalks: RwLock<HashMap<BeneficiaryId, Crosswalk>>,
}

impl InMemoryCrosswalkRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            crosswalks: RwLock::new(HashMap::new()),
        }
    }

    async fn find_where(
        &self,
        predicate: impl Fn(&Crosswalk) -> bool + Send,
    ) -> Option<Crosswalk> {
        self.crosswalks
            .read()
            .await
            .values()
            .find(|crosswalk| predicate(crosswalk))
            .cloned()
    }

    async fn list_where(&self, predicate: impl Fn(&Crosswalk) -> bool + Send) -> Vec<Crosswalk> {
        let crosswalks = self.crosswalks.read().await;

        let mut listed: Vec<Crosswalk> = crosswalks
            .values()
            .filter(|crosswalk| predicate(crosswalk))
            .cloned()
            .collect();
        listed.sort_by_key(|crosswalk| crosswalk.created_at);

        listed
    }
}

#[async_trait]
impl CrosswalkRepository for InMemoryCrosswalkRepository {
    async fn find_by_claim_number_hash(
        &self,
        hash: &IdentityHash,
    ) -> AppResult<Option<Crosswalk>> {
        Ok(self
            .find_where(|crosswalk| crosswalk.claim_number_hash.as_ref() == Some(hash))
            .await)
    }

    async fn find_by_member_id_hash(&self, hash: &IdentityHash) -> AppResult<Option<Crosswalk>> {
        Ok(self
            .find_where(|crosswalk| crosswalk.member_id_hash.as_ref() == Some(hash))
            .await)
    }

    async fn find_by_beneficiary(
        &self,
        beneficiary_id: BeneficiaryId,
    ) -> AppResult<Option<Crosswalk>> {
        Ok(self.crosswalks.read().await.get(&beneficiary_id).cloned())
    }

    async fn insert(&self, crosswalk: &Crosswalk) -> AppResult<()> {
        let mut crosswalks = self.crosswalks.write().await;

        if crosswalks.contains_key(&crosswalk.beneficiary_id) {
            return Err(AppError::Internal(format!(
                "crosswalk already exists for beneficiary {}",
                crosswalk.beneficiary_id
            )));
        }
        let record_id_taken = crosswalks
            .values()
            .any(|existing| existing.external_record_id == crosswalk.external_record_id);
        if record_id_taken {
            return Err(AppError::Internal(format!(
                "external record id '{}' already mapped",
                crosswalk.external_record_id
            )));
        }

        crosswalks.insert(crosswalk.beneficiary_id, crosswalk.clone());
        Ok(())
    }

    async fn update_identity(&self, crosswalk: &Crosswalk) -> AppResult<()> {
        let mut crosswalks = self.crosswalks.write().await;

        let stored = crosswalks
            .get_mut(&crosswalk.beneficiary_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "crosswalk for beneficiary {}",
                    crosswalk.beneficiary_id
                ))
            })?;

        // The external record id keeps its stored value, as in the SQL
        // adapter's SET list.
        stored.claim_number_hash = crosswalk.claim_number_hash.clone();
        stored.member_id_hash = crosswalk.member_id_hash.clone();
        stored.authoritative = crosswalk.authoritative;

        Ok(())
    }

    async fn delete(&self, beneficiary_id: BeneficiaryId) -> AppResult<Option<Crosswalk>> {
        Ok(self.crosswalks.write().await.remove(&beneficiary_id))
    }

    async fn list_real(&self) -> AppResult<Vec<Crosswalk>> {
        Ok(self
            .list_where(|crosswalk| crosswalk.external_record_id.is_real())
            .await)
    }

    async fn list_synthetic(&self) -> AppResult<Vec<Crosswalk>> {
        Ok(self
            .list_where(|crosswalk| crosswalk.external_record_id.is_synthetic())
            .await)
    }
}
