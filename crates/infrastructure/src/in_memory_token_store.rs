//! In-memory token store for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use carebridge_application::TokenStore;
use carebridge_core::AppResult;
use carebridge_domain::{ApplicationId, BeneficiaryId, TokenId, TokenRecord};

/// In-memory token store implementation.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    tokens: RwLock<HashMap<TokenId, TokenRecord>>,
}

impl InMemoryTokenStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Stores an issued token, standing in for the protocol layer.
    pub async fn issue(&self, token: TokenRecord) {
        self.tokens.write().await.insert(token.id, token);
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn list_active(
        &self,
        beneficiary_id: BeneficiaryId,
        application_id: ApplicationId,
    ) -> AppResult<Vec<TokenRecord>> {
        Ok(self
            .tokens
            .read()
            .await
            .values()
            .filter(|token| {
                token.beneficiary_id == beneficiary_id && token.application_id == application_id
            })
            .cloned()
            .collect())
    }

    async fn delete(&self, id: TokenId) -> AppResult<Option<TokenRecord>> {
        Ok(self.tokens.write().await.remove(&id))
    }
}
