//! Shared in-process fakes for service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::RwLock;

use carebridge_core::{AppError, AppResult};
use carebridge_domain::{
    AccessType, Application, ApplicationId, ArchivedCrosswalk, ArchivedDataAccessGrant,
    ArchivedToken, BeneficiaryId, DataAccessGrant, GrantId, ScopeSet, TokenId, TokenRecord,
};

use crate::access_ports::{ArchiveWriter, GrantRepository, TokenStore};

pub(crate) fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single() {
        Some(value) => value,
        None => panic!("invalid test timestamp"),
    }
}

pub(crate) fn application(access_type: AccessType) -> Application {
    Application {
        id: ApplicationId::new(),
        name: "records-viewer".to_owned(),
        access_type,
        active: true,
        end_date: None,
        requires_demographic_scopes: true,
        created_at: utc(2024, 1, 1),
    }
}

pub(crate) fn scopes(values: &[&str]) -> ScopeSet {
    match ScopeSet::parse(values.iter().map(|value| (*value).to_owned())) {
        Ok(set) => set,
        Err(error) => panic!("invalid test scopes: {error}"),
    }
}

/// Grant repository fake enforcing the pair-uniqueness constraint, with an
/// optional one-shot race injection: the next insert lands a competing row
/// first and reports a duplicate, like a lost uniqueness race.
#[derive(Default)]
pub(crate) struct FakeGrants {
    pub rows: RwLock<HashMap<GrantId, DataAccessGrant>>,
    pub race_once: AtomicBool,
}

impl FakeGrants {
    pub(crate) async fn seed(&self, grant: DataAccessGrant) {
        self.rows.write().await.insert(grant.id, grant);
    }

    pub(crate) async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl GrantRepository for FakeGrants {
    async fn insert(&self, grant: &DataAccessGrant) -> AppResult<()> {
        let mut rows = self.rows.write().await;

        if self.race_once.swap(false, Ordering::SeqCst) {
            let winner = DataAccessGrant {
                id: GrantId::new(),
                ..grant.clone()
            };
            rows.insert(winner.id, winner);
            return Err(AppError::DuplicateGrant(
                "uniqueness violation on (beneficiary, application)".to_owned(),
            ));
        }

        let duplicate = rows.values().any(|row| {
            row.beneficiary_id == grant.beneficiary_id
                && row.application_id == grant.application_id
        });
        if duplicate {
            return Err(AppError::DuplicateGrant(
                "uniqueness violation on (beneficiary, application)".to_owned(),
            ));
        }

        rows.insert(grant.id, grant.clone());
        Ok(())
    }

    async fn find(
        &self,
        beneficiary_id: BeneficiaryId,
        application_id: ApplicationId,
    ) -> AppResult<Option<DataAccessGrant>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|row| {
                row.beneficiary_id == beneficiary_id && row.application_id == application_id
            })
            .cloned())
    }

    async fn delete(&self, id: GrantId) -> AppResult<Option<DataAccessGrant>> {
        Ok(self.rows.write().await.remove(&id))
    }

    async fn list_missing_expiration(
        &self,
        application_id: ApplicationId,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<DataAccessGrant>> {
        let mut rows: Vec<DataAccessGrant> = self
            .rows
            .read()
            .await
            .values()
            .filter(|row| {
                row.application_id == application_id
                    && row.expiration_date.is_none()
                    && row.created_at >= begin
                    && row.created_at <= end
            })
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.created_at);
        Ok(rows)
    }

    async fn set_expiration(&self, id: GrantId, expiration: DateTime<Utc>) -> AppResult<()> {
        match self.rows.write().await.get_mut(&id) {
            Some(row) => {
                row.expiration_date = Some(expiration);
                Ok(())
            }
            None => Err(AppError::NotFound(format!("grant {id}"))),
        }
    }
}

/// Token store fake.
#[derive(Default)]
pub(crate) struct FakeTokens {
    pub rows: RwLock<HashMap<TokenId, TokenRecord>>,
}

impl FakeTokens {
    pub(crate) async fn seed(&self, token: TokenRecord) {
        self.rows.write().await.insert(token.id, token);
    }

    pub(crate) async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl TokenStore for FakeTokens {
    async fn list_active(
        &self,
        beneficiary_id: BeneficiaryId,
        application_id: ApplicationId,
    ) -> AppResult<Vec<TokenRecord>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|row| {
                row.beneficiary_id == beneficiary_id && row.application_id == application_id
            })
            .cloned()
            .collect())
    }

    async fn delete(&self, id: TokenId) -> AppResult<Option<TokenRecord>> {
        Ok(self.rows.write().await.remove(&id))
    }
}

/// Recording archive writer with per-kind failure injection.
#[derive(Default)]
pub(crate) struct FakeArchive {
    pub grants: RwLock<Vec<ArchivedDataAccessGrant>>,
    pub tokens: RwLock<Vec<ArchivedToken>>,
    pub crosswalks: RwLock<Vec<ArchivedCrosswalk>>,
    pub fail_grants: AtomicBool,
}

#[async_trait]
impl ArchiveWriter for FakeArchive {
    async fn archive_grant(&self, archived: &ArchivedDataAccessGrant) -> AppResult<()> {
        if self.fail_grants.load(Ordering::SeqCst) {
            return Err(AppError::Internal("archive store unavailable".to_owned()));
        }
        self.grants.write().await.push(archived.clone());
        Ok(())
    }

    async fn archive_token(&self, archived: &ArchivedToken) -> AppResult<()> {
        self.tokens.write().await.push(archived.clone());
        Ok(())
    }

    async fn archive_crosswalk(&self, archived: &ArchivedCrosswalk) -> AppResult<()> {
        self.crosswalks.write().await.push(archived.clone());
        Ok(())
    }
}
