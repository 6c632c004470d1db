//! In-memory archive writer for tests and local development.

use async_trait::async_trait;
use tokio::sync::RwLock;

use carebridge_application::ArchiveWriter;
use carebridge_core::AppResult;
use carebridge_domain::{ArchivedCrosswalk, ArchivedDataAccessGrant, ArchivedToken};

/// In-memory archive writer implementation. Append-only, like the real one.
#[derive(Debug, Default)]
pub struct InMemoryArchiveWriter {
    grants: RwLock<Vec<ArchivedDataAccessGrant>>,
    tokens: RwLock<Vec<ArchivedToken>>,
    crosswalks: RwLock<Vec<ArchivedCrosswalk>>,
}

impl InMemoryArchiveWriter {
    /// Creates an empty in-memory archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the archived grants, in write order.
    pub async fn archived_grants(&self) -> Vec<ArchivedDataAccessGrant> {
        self.grants.read().await.clone()
    }

    /// Returns the archived tokens, in write order.
    pub async fn archived_tokens(&self) -> Vec<ArchivedToken> {
        self.tokens.read().await.clone()
    }

    /// Returns the archived crosswalk snapshots, in write order.
    pub async fn archived_crosswalks(&self) -> Vec<ArchivedCrosswalk> {
        self.crosswalks.read().await.clone()
    }
}

#[async_trait]
impl ArchiveWriter for InMemoryArchiveWriter {
    async fn archive_grant(&self, archived: &ArchivedDataAccessGrant) -> AppResult<()> {
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
