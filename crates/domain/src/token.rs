//! Token records consumed from the external protocol layer.
//!
//! Issuance, encoding, and the OAuth state machine live outside this core.
//! These types carry only what reconciliation and archival need.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApplicationId, BeneficiaryId, ScopeSet};

/// Unique identifier for an issued token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(Uuid);

impl TokenId {
    /// Creates a new random token identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a token identifier from an existing UUID value.
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

impl Default for TokenId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Token kind discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Bearer access token.
    Access,
    /// Refresh token paired with an access token.
    Refresh,
}

impl TokenKind {
    /// Returns the storage string for this token kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }

    /// Parses a storage string into a token kind.
    pub fn parse(value: &str) -> carebridge_core::AppResult<Self> {
        match value {
            "access" => Ok(Self::Access),
            "refresh" => Ok(Self::Refresh),
            _ => Err(carebridge_core::AppError::Validation(format!(
                "unknown token kind '{value}'"
            ))),
        }
    }
}

/// A live token as the protocol layer persists it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Token identifier.
    pub id: TokenId,
    /// Beneficiary the token was issued for.
    pub beneficiary_id: BeneficiaryId,
    /// Application the token was issued to.
    pub application_id: ApplicationId,
    /// Access or refresh token.
    pub kind: TokenKind,
    /// Scopes granted at issuance.
    pub scopes: ScopeSet,
    /// Protocol-layer expiry, if any.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Append-only copy of a deleted token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedToken {
    /// Identifier of the deleted token.
    pub token_id: TokenId,
    /// Beneficiary of the deleted token.
    pub beneficiary_id: BeneficiaryId,
    /// Application of the deleted token.
    pub application_id: ApplicationId,
    /// Kind of the deleted token.
    pub kind: TokenKind,
    /// Scopes the token carried.
    pub scopes: ScopeSet,
    /// Expiry the token carried.
    pub expires_at: Option<DateTime<Utc>>,
    /// When the archive copy was written.
    pub archived_at: DateTime<Utc>,
}

impl ArchivedToken {
    /// Builds the archive copy of a token being deleted.
    #[must_use]
    pub fn from_token(token: &TokenRecord, archived_at: DateTime<Utc>) -> Self {
        Self {
            token_id: token.id,
            beneficiary_id: token.beneficiary_id,
            application_id: token.application_id,
            kind: token.kind,
            scopes: token.scopes.clone(),
            expires_at: token.expires_at,
            archived_at,
        }
    }
}
