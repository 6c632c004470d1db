//! Third-party application domain types.

use std::str::FromStr;

use carebridge_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a registered application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(Uuid);

impl ApplicationId {
    /// Creates a new random application identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an application identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ApplicationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Policy category governing how an application's grants expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    /// Single authorization; no dated expiry, revocation removes the grant.
    OneTime,
    /// Grants expire thirteen months after creation.
    ThirteenMonth,
    /// Grants expire with the research study's end date.
    ResearchStudy,
}

impl AccessType {
    /// Returns the storage string for this access type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneTime => "one_time",
            Self::ThirteenMonth => "thirteen_month",
            Self::ResearchStudy => "research_study",
        }
    }
}

impl FromStr for AccessType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "one_time" => Ok(Self::OneTime),
            "thirteen_month" => Ok(Self::ThirteenMonth),
            "research_study" => Ok(Self::ResearchStudy),
            _ => Err(AppError::Validation(format!(
                "unknown access type '{value}'"
            ))),
        }
    }
}

/// A registered third-party application.
///
/// Registration and credential management live in the external protocol
/// layer; this core consumes the fields that gate access decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    /// Application identifier.
    pub id: ApplicationId,
    /// Human-readable application name.
    pub name: String,
    /// Expiration policy category.
    pub access_type: AccessType,
    /// Whether the application is administratively enabled.
    pub active: bool,
    /// Study end date; meaningful only for [`AccessType::ResearchStudy`].
    pub end_date: Option<DateTime<Utc>>,
    /// Whether the application requests demographic (personal) scopes.
    pub requires_demographic_scopes: bool,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

impl Application {
    /// Validates access-type-dependent field combinations.
    ///
    /// An `end_date` is only meaningful for research studies; carrying one
    /// on another access type is a registration error worth surfacing early.
    pub fn validate(&self) -> AppResult<()> {
        if self.end_date.is_some() && self.access_type != AccessType::ResearchStudy {
            return Err(AppError::Validation(format!(
                "application '{}' has an end date but access type '{}'",
                self.name,
                self.access_type.as_str()
            )));
        }

        Ok(())
    }
}
