//! PostgreSQL adapter onto the protocol layer's token table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use carebridge_application::TokenStore;
use carebridge_core::{AppError, AppResult};
use carebridge_domain::{
    ApplicationId, BeneficiaryId, ScopeSet, TokenId, TokenKind, TokenRecord,
};

/// PostgreSQL implementation of the token store port.
#[derive(Clone)]
pub struct PostgresTokenStore {
    pool: PgPool,
}

impl PostgresTokenStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PostgresTokenStore {
    async fn list_active(
        &self,
        beneficiary_id: BeneficiaryId,
        application_id: ApplicationId,
    ) -> AppResult<Vec<TokenRecord>> {
        let rows = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT id, beneficiary_id, application_id, kind, scopes, expires_at
            FROM tokens
            WHERE beneficiary_id = $1 AND application_id = $2
            "#,
        )
        .bind(beneficiary_id.as_uuid())
        .bind(application_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list tokens: {error}")))?;

        rows.into_iter().map(TokenRecord::try_from).collect()
    }

    async fn delete(&self, id: TokenId) -> AppResult<Option<TokenRecord>> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            DELETE FROM tokens
            WHERE id = $1
            RETURNING id, beneficiary_id, application_id, kind, scopes, expires_at
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete token: {error}")))?;

        row.map(TokenRecord::try_from).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TokenRow {
    id: uuid::Uuid,
    beneficiary_id: uuid::Uuid,
    application_id: uuid::Uuid,
    kind: String,
    scopes: String,
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<TokenRow> for TokenRecord {
    type Error = AppError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TokenId::from_uuid(row.id),
            beneficiary_id: BeneficiaryId::from_uuid(row.beneficiary_id),
            application_id: ApplicationId::from_uuid(row.application_id),
            kind: TokenKind::parse(&row.kind)?,
            scopes: ScopeSet::from_space_separated(&row.scopes)?,
            expires_at: row.expires_at,
        })
    }
}
