//! PostgreSQL-backed append-only archive writer.

use async_trait::async_trait;
use sqlx::PgPool;

use carebridge_application::ArchiveWriter;
use carebridge_core::{AppError, AppResult};
use carebridge_domain::{
    ArchivedCrosswalk, ArchivedDataAccessGrant, ArchivedToken, IdentityHash,
};

/// PostgreSQL implementation of the archive writer port.
///
/// Insert-only: no update or delete statements exist against the archive
/// tables anywhere in this crate.
#[derive(Clone)]
pub struct PostgresArchiveWriter {
    pool: PgPool,
}

impl PostgresArchiveWriter {
    /// Creates a writer with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArchiveWriter for PostgresArchiveWriter {
    async fn archive_grant(&self, archived: &ArchivedDataAccessGrant) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO archived_data_access_grants
                (grant_id, beneficiary_id, application_id, created_at,
                 expiration_date, archived_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(archived.grant_id.as_uuid())
        .bind(archived.beneficiary_id.as_uuid())
        .bind(archived.application_id.as_uuid())
        .bind(archived.created_at)
        .bind(archived.expiration_date)
        .bind(archived.archived_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to archive grant: {error}")))?;

        Ok(())
    }

    async fn archive_token(&self, archived: &ArchivedToken) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO archived_tokens
                (token_id, beneficiary_id, application_id, kind, scopes,
                 expires_at, archived_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(archived.token_id.as_uuid())
        .bind(archived.beneficiary_id.as_uuid())
        .bind(archived.application_id.as_uuid())
        .bind(archived.kind.as_str())
        .bind(archived.scopes.to_space_separated())
        .bind(archived.expires_at)
        .bind(archived.archived_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to archive token: {error}")))?;

        Ok(())
    }

    async fn archive_crosswalk(&self, archived: &ArchivedCrosswalk) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO archived_crosswalks
                (beneficiary_id, external_record_id, claim_number_hash,
                 member_id_hash, authoritative, change_tag, archived_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(archived.beneficiary_id.as_uuid())
        .bind(archived.external_record_id.as_str())
        .bind(archived.claim_number_hash.as_ref().map(IdentityHash::as_str))
        .bind(archived.member_id_hash.as_ref().map(IdentityHash::as_str))
        .bind(archived.authoritative.as_str())
        .bind(archived.change_tag.as_str())
        .bind(archived.archived_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to archive crosswalk: {error}")))?;

        Ok(())
    }
}
