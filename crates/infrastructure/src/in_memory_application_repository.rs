//! In-memory application repository for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use carebridge_application::ApplicationRepository;
use carebridge_core::AppResult;
use carebridge_domain::{Application, ApplicationId};

/// In-memory application repository implementation.
#[derive(Debug, Default)]
pub struct InMemoryApplicationRepository {
    applications: RwLock<HashMap<ApplicationId, Application>>,
}

impl InMemoryApplicationRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            applications: RwLock::new(HashMap::new()),
        }
    }

    /// Registers an application. Replaces any existing row with the same id.
    pub async fn register(&self, application: Application) {
        self.applications
            .write()
            .await
            .insert(application.id, application);
    }
}

#[async_trait]
impl ApplicationRepository for InMemoryApplicationRepository {
    async fn find_by_id(&self, id: ApplicationId) -> AppResult<Option<Application>> {
        Ok(self.applications.read().await.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Application>> {
        Ok(self
            .applications
            .read()
            .await
            .values()
            .find(|application| application.name == name)
            .cloned())
    }
}
