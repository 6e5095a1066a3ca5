//! In-memory OAuth account link storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use idport_auth::storage::OAuthAccountStorage;
use idport_auth::types::{OAuthAccount, Provider};
use idport_auth::{AuthError, AuthResult};

/// In-memory implementation of [`OAuthAccountStorage`].
#[derive(Default)]
pub struct MemoryOAuthAccountStorage {
    accounts: RwLock<HashMap<Uuid, OAuthAccount>>,
}

impl MemoryOAuthAccountStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OAuthAccountStorage for MemoryOAuthAccountStorage {
    async fn create(&self, account: &OAuthAccount) -> AuthResult<()> {
        let mut accounts = self.accounts.write().await;
        let duplicate = accounts.values().any(|a| {
            a.provider == account.provider && a.provider_user_id == account.provider_user_id
        });
        if duplicate {
            return Err(AuthError::conflict("Provider identity already linked"));
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn find_by_provider_identity(
        &self,
        provider: Provider,
        provider_user_id: &str,
    ) -> AuthResult<Option<OAuthAccount>> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.provider == provider && a.provider_user_id == provider_user_id)
            .cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> AuthResult<Vec<OAuthAccount>> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, user_id: Uuid, provider: Provider) -> AuthResult<()> {
        let mut accounts = self.accounts.write().await;
        let id = accounts
            .values()
            .find(|a| a.user_id == user_id && a.provider == provider)
            .map(|a| a.id)
            .ok_or_else(|| AuthError::storage("Account link not found"))?;
        accounts.remove(&id);
        Ok(())
    }
}
