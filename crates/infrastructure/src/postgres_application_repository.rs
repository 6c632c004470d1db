//! PostgreSQL-backed read-only application repository.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use carebridge_application::ApplicationRepository;
use carebridge_core::{AppError, AppResult};
use carebridge_domain::{AccessType, Application, ApplicationId};

/// PostgreSQL implementation of the application repository port.
#[derive(Clone)]
pub struct PostgresApplicationRepository {
    pool: PgPool,
}

impl PostgresApplicationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationRepository for PostgresApplicationRepository {
    async fn find_by_id(&self, id: ApplicationId) -> AppResult<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            r#"
            SELECT id, name, access_type, active, end_date,
                   requires_demographic_scopes, created_at
            FROM applications
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find application: {error}")))?;

        row.map(Application::try_from).transpose()
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            r#"
            SELECT id, name, access_type, active, end_date,
                   requires_demographic_scopes, created_at
            FROM applications
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find application: {error}")))?;

        row.map(Application::try_from).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ApplicationRow {
    id: uuid::Uuid,
    name: String,
    access_type: String,
    active: bool,
    end_date: Option<DateTime<Utc>>,
    requires_demographic_scopes: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = AppError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ApplicationId::from_uuid(row.id),
            name: row.name,
            access_type: AccessType::from_str(&row.access_type)?,
            active: row.active,
            end_date: row.end_date,
            requires_demographic_scopes: row.requires_demographic_scopes,
            created_at: row.created_at,
        })
    }
}
