//! In-memory OAuth CSRF state storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use idport_auth::AuthResult;
use idport_auth::oauth::OAuthState;
use idport_auth::storage::OAuthStateStorage;

/// In-memory implementation of [`OAuthStateStorage`], keyed by state value.
///
/// `consume` removes the entry, so a state value can never complete two
/// callbacks.
#[derive(Default)]
pub struct MemoryOAuthStateStorage {
    entries: RwLock<HashMap<String, OAuthState>>,
}

impl MemoryOAuthStateStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OAuthStateStorage for MemoryOAuthStateStorage {
    async fn create(&self, entry: &OAuthState) -> AuthResult<()> {
        self.entries
            .write()
            .await
            .insert(entry.state.clone(), entry.clone());
        Ok(())
    }

    async fn consume(&self, state: &str) -> AuthResult<Option<OAuthState>> {
        Ok(self.entries.write().await.remove(state))
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired());
        Ok((before - entries.len()) as u64)
    }
}
