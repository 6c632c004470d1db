//! PostgreSQL-backed grant repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use carebridge_application::GrantRepository;
use carebridge_core::{AppError, AppResult};
use carebridge_domain::{ApplicationId, BeneficiaryId, DataAccessGrant, GrantId};

/// PostgreSQL implementation of the grant repository port.
#[derive(Clone)]
pub struct PostgresGrantRepository {
    pool: PgPool,
}

impl PostgresGrantRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GrantRepository for PostgresGrantRepository {
    async fn insert(&self, grant: &DataAccessGrant) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO data_access_grants
                (id, beneficiary_id, application_id, created_at, expiration_date)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(grant.id.as_uuid())
        .bind(grant.beneficiary_id.as_uuid())
        .bind(grant.application_id.as_uuid())
        .bind(grant.created_at)
        .bind(grant.expiration_date)
        .execute(&self.pool)
        .await
        .map_err(|error| match &error {
            // The unique constraint on (beneficiary_id, application_id) is
            // the source of truth for the one-grant-per-pair invariant.
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::DuplicateGrant(
                format!(
                    "grant already exists for beneficiary {} and application {}",
                    grant.beneficiary_id, grant.application_id
                ),
            ),
            _ => AppError::Internal(format!("failed to insert grant: {error}")),
        })?;

        Ok(())
    }

    async fn find(
        &self,
        beneficiary_id: BeneficiaryId,
        application_id: ApplicationId,
    ) -> AppResult<Option<DataAccessGrant>> {
        let row = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT id, beneficiary_id, application_id, created_at, expiration_date
            FROM data_access_grants
            WHERE beneficiary_id = $1 AND application_id = $2
            "#,
        )
        .bind(beneficiary_id.as_uuid())
        .bind(application_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find grant: {error}")))?;

        Ok(row.map(DataAccessGrant::from))
    }

    async fn delete(&self, id: GrantId) -> AppResult<Option<DataAccessGrant>> {
        let row = sqlx::query_as::<_, GrantRow>(
            r#"
            DELETE FROM data_access_grants
            WHERE id = $1
            RETURNING id, beneficiary_id, application_id, created_at, expiration_date
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete grant: {error}")))?;

        Ok(row.map(DataAccessGrant::from))
    }

    async fn list_missing_expiration(
        &self,
        application_id: ApplicationId,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<DataAccessGrant>> {
        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT id, beneficiary_id, application_id, created_at, expiration_date
            FROM data_access_grants
            WHERE application_id = $1
              AND expiration_date IS NULL
              AND created_at >= $2
              AND created_at <= $3
            ORDER BY created_at
            "#,
        )
        .bind(application_id.as_uuid())
        .bind(begin)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list grants missing expiration: {error}"))
        })?;

        Ok(rows.into_iter().map(DataAccessGrant::from).collect())
    }

    async fn set_expiration(&self, id: GrantId, expiration: DateTime<Utc>) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE data_access_grants
            SET expiration_date = $2
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(expiration)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to set grant expiration: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("grant {id}")));
        }

        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GrantRow {
    id: uuid::Uuid,
    beneficiary_id: uuid::Uuid,
    application_id: uuid::Uuid,
    created_at: DateTime<Utc>,
    expiration_date: Option<DateTime<Utc>>,
}

impl From<GrantRow> for DataAccessGrant {
    fn from(row: GrantRow) -> Self {
        Self {
            id: GrantId::from_uuid(row.id),
            beneficiary_id: BeneficiaryId::from_uuid(row.beneficiary_id),
            application_id: ApplicationId::from_uuid(row.application_id),
            created_at: row.created_at,
            expiration_date: row.expiration_date,
        }
    }
}
