//! Offline batch repair of grants missing an expiration date.
//!
//! Runs once and exits. Reads its parameters from the environment, refuses
//! to write unless explicitly confirmed, and reports a summary of what it
//! did (or would do, in a dry run).

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use carebridge_application::{ApplicationRepository, RepairRange, RepairService};
use carebridge_core::{AppError, AppResult};
use carebridge_infrastructure::{PostgresApplicationRepository, PostgresGrantRepository};

#[derive(Debug, Clone)]
struct RepairConfig {
    database_url: String,
    application_name: String,
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
    turn_on_date: Option<DateTime<Utc>>,
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = RepairConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    let applications = PostgresApplicationRepository::new(pool.clone());
    let application = applications
        .find_by_name(config.application_name.as_str())
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "application '{}' is not registered",
                config.application_name
            ))
        })?;
    application.validate()?;

    let range = RepairRange::closed(config.begin, config.end, Utc::now())?;
    let repair = RepairService::new(Arc::new(PostgresGrantRepository::new(pool)));

    info!(
        application = %application.id,
        access_type = application.access_type.as_str(),
        begin = %range.begin(),
        end = %range.end(),
        dry_run = config.dry_run,
        "starting grant repair batch"
    );

    let summary = match config.turn_on_date {
        Some(turn_on_date) => {
            repair
                .bulk_repair(&application, range, turn_on_date, config.dry_run)
                .await?
        }
        None => {
            repair
                .set_missing_expiration(&application, range, config.dry_run)
                .await?
        }
    };

    let rendered = serde_json::to_string(&summary)
        .map_err(|error| AppError::Internal(format!("failed to render summary: {error}")))?;
    println!("{rendered}");

    if summary.failed > 0 {
        return Err(AppError::Internal(format!(
            "{} grant(s) failed to repair; re-run to converge",
            summary.failed
        )));
    }

    Ok(())
}

impl RepairConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let application_name = required_env("REPAIR_APPLICATION")?;
        let begin = parse_env_datetime("REPAIR_BEGIN")?.ok_or_else(|| {
            AppError::Validation("REPAIR_BEGIN is required".to_owned())
        })?;
        let end = parse_env_datetime("REPAIR_END")?.ok_or_else(|| {
            AppError::Validation("REPAIR_END is required".to_owned())
        })?;
        let turn_on_date = parse_env_datetime("LIMIT_TURN_ON_DATE")?;

        // Writes require CONFIRM=yes; anything else stays a dry run.
        let dry_run = env::var("CONFIRM")
            .map(|value| !value.trim().eq_ignore_ascii_case("yes"))
            .unwrap_or(true);

        Ok(Self {
            database_url,
            application_name,
            begin,
            end,
            turn_on_date,
            dry_run,
        })
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_datetime(name: &str) -> AppResult<Option<DateTime<Utc>>> {
    match env::var(name) {
        Ok(value) => DateTime::parse_from_rfc3339(value.trim())
            .map(|parsed| Some(parsed.with_timezone(&Utc)))
            .map_err(|error| {
                AppError::Validation(format!("invalid {name} value '{value}': {error}"))
            }),
        Err(_) => Ok(None),
    }
}
