//! PostgreSQL-backed crosswalk repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use carebridge_application::CrosswalkRepository;
use carebridge_core::{AppError, AppResult};
use carebridge_domain::{
    AuthoritativeIdentity, BeneficiaryId, Crosswalk, ExternalRecordId, IdentityHash,
};

/// PostgreSQL implementation of the crosswalk repository port.
#[derive(Clone)]
pub struct PostgresCrosswalkRepository {
    pool: PgPool,
}

impl PostgresCrosswalkRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_hash(&self, column: HashColumn, hash: &IdentityHash) -> AppResult<Option<Crosswalk>> {
        let query = match column {
            HashColumn::ClaimNumber => {
                r#"
                SELECT beneficiary_id, external_record_id, claim_number_hash,
                       member_id_hash, authoritative, created_at
                FROM crosswalks
                WHERE claim_number_hash = $1
                "#
            }
            HashColumn::MemberId => {
                r#"
                SELECT beneficiary_id, external_record_id, claim_number_hash,
                       member_id_hash, authoritative, created_at
                FROM crosswalks
                WHERE member_id_hash = $1
                "#
            }
        };

        let row = sqlx::query_as::<_, CrosswalkRow>(query)
            .bind(hash.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to find crosswalk: {error}")))?;

        row.map(Crosswalk::try_from).transpose()
    }
}

#[derive(Clone, Copy)]
enum HashColumn {
    ClaimNumber,
    MemberId,
}

#[async_trait]
impl CrosswalkRepository for PostgresCrosswalkRepository {
    async fn find_by_claim_number_hash(
        &self,
        hash: &IdentityHash,
    ) -> AppResult<Option<Crosswalk>> {
        self.find_by_hash(HashColumn::ClaimNumber, hash).await
    }

    async fn find_by_member_id_hash(&self, hash: &IdentityHash) -> AppResult<Option<Crosswalk>> {
        self.find_by_hash(HashColumn::MemberId, hash).await
    }

    async fn find_by_beneficiary(
        &self,
        beneficiary_id: BeneficiaryId,
    ) -> AppResult<Option<Crosswalk>> {
        let row = sqlx::query_as::<_, CrosswalkRow>(
            r#"
            SELECT beneficiary_id, external_record_id, claim_number_hash,
                   member_id_hash, authoritative, created_at
            FROM crosswalks
            WHERE beneficiary_id = $1
            "#,
        )
        .bind(beneficiary_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find crosswalk: {error}")))?;

        row.map(Crosswalk::try_from).transpose()
    }

    async fn insert(&self, crosswalk: &Crosswalk) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO crosswalks
                (beneficiary_id, external_record_id, claim_number_hash,
                 member_id_hash, authoritative, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(crosswalk.beneficiary_id.as_uuid())
        .bind(crosswalk.external_record_id.as_str())
        .bind(crosswalk.claim_number_hash.as_ref().map(IdentityHash::as_str))
        .bind(crosswalk.member_id_hash.as_ref().map(IdentityHash::as_str))
        .bind(crosswalk.authoritative.as_str())
        .bind(crosswalk.created_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert crosswalk: {error}")))?;

        Ok(())
    }

    async fn update_identity(&self, crosswalk: &Crosswalk) -> AppResult<()> {
        // The external record id is deliberately absent from the SET list:
        // it is immutable once recorded.
        let result = sqlx::query(
            r#"
            UPDATE crosswalks
            SET claim_number_hash = $2,
                member_id_hash = $3,
                authoritative = $4
            WHERE beneficiary_id = $1
            "#,
        )
        .bind(crosswalk.beneficiary_id.as_uuid())
        .bind(crosswalk.claim_number_hash.as_ref().map(IdentityHash::as_str))
        .bind(crosswalk.member_id_hash.as_ref().map(IdentityHash::as_str))
        .bind(crosswalk.authoritative.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update crosswalk: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "crosswalk for beneficiary {}",
                crosswalk.beneficiary_id
            )));
        }

        Ok(())
    }

    async fn delete(&self, beneficiary_id: BeneficiaryId) -> AppResult<Option<Crosswalk>> {
        let row = sqlx::query_as::<_, CrosswalkRow>(
            r#"
            DELETE FROM crosswalks
            WHERE beneficiary_id = $1
            RETURNING beneficiary_id, external_record_id, claim_number_hash,
                      member_id_hash, authoritative, created_at
            "#,
        )
        .bind(beneficiary_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete crosswalk: {error}")))?;

        row.map(Crosswalk::try_from).transpose()
    }

    async fn list_real(&self) -> AppResult<Vec<Crosswalk>> {
        let rows = sqlx::query_as::<_, CrosswalkRow>(
            r#"
            SELECT beneficiary_id, external_record_id, claim_number_hash,
                   member_id_hash, authoritative, created_at
            FROM crosswalks
            WHERE external_record_id NOT LIKE '-%'
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list crosswalks: {error}")))?;

        rows.into_iter().map(Crosswalk::try_from).collect()
    }

    async fn list_synthetic(&self) -> AppResult<Vec<Crosswalk>> {
        let rows = sqlx::query_as::<_, CrosswalkRow>(
            r#"
            SELECT beneficiary_id, external_record_id, claim_number_hash,
                   member_id_hash, authoritative, created_at
            FROM crosswalks
            WHERE external_record_id LIKE '-%'
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list crosswalks: {error}")))?;

        rows.into_iter().map(Crosswalk::try_from).collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CrosswalkRow {
    beneficiary_id: uuid::Uuid,
    external_record_id: String,
    claim_number_hash: Option<String>,
    member_id_hash: Option<String>,
    authoritative: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CrosswalkRow> for Crosswalk {
    type Error = AppError;

    fn try_from(row: CrosswalkRow) -> Result<Self, Self::Error> {
        Ok(Self {
            beneficiary_id: BeneficiaryId::from_uuid(row.beneficiary_id),
            external_record_id: ExternalRecordId::new(row.external_record_id)?,
            claim_number_hash: row.claim_number_hash.map(IdentityHash::from_hex).transpose()?,
            member_id_hash: row.member_id_hash.map(IdentityHash::from_hex).transpose()?,
            authoritative: AuthoritativeIdentity::parse(&row.authoritative)?,
            created_at: row.created_at,
        })
    }
}
