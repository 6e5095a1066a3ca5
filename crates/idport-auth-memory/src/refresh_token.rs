//! In-memory refresh token storage.
//!
//! `consume` runs entirely under the write lock, so concurrent rotations
//! of the same token resolve to exactly one winner.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use idport_auth::storage::RefreshTokenStorage;
use idport_auth::types::RefreshToken;
use idport_auth::{AuthError, AuthResult};

/// In-memory implementation of [`RefreshTokenStorage`], keyed by token hash.
#[derive(Default)]
pub struct MemoryRefreshTokenStorage {
    tokens: RwLock<HashMap<String, RefreshToken>>,
}

impl MemoryRefreshTokenStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStorage for MemoryRefreshTokenStorage {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&token.token_hash) {
            return Err(AuthError::storage("Duplicate token hash"));
        }
        tokens.insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
        Ok(self.tokens.read().await.get(token_hash).cloned())
    }

    async fn consume(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
        let mut tokens = self.tokens.write().await;
        let token = tokens
            .get_mut(token_hash)
            .ok_or_else(|| AuthError::invalid_grant("Unknown refresh token"))?;

        if token.revoked_at.is_some() {
            return Ok(None);
        }

        let before = token.clone();
        token.revoked_at = Some(OffsetDateTime::now_utc());
        Ok(Some(before))
    }

    async fn revoke(&self, token_hash: &str) -> AuthResult<()> {
        if let Some(token) = self.tokens.write().await.get_mut(token_hash) {
            token.revoked_at.get_or_insert(OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn revoke_chain(&self, chain_id: Uuid) -> AuthResult<u64> {
        let mut tokens = self.tokens.write().await;
        let now = OffsetDateTime::now_utc();
        let mut revoked = 0u64;
        for token in tokens.values_mut() {
            if token.chain_id == chain_id && token.revoked_at.is_none() {
                token.revoked_at = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn revoke_by_user(&self, user_id: Uuid) -> AuthResult<u64> {
        let mut tokens = self.tokens.write().await;
        let now = OffsetDateTime::now_utc();
        let mut revoked = 0u64;
        for token in tokens.values_mut() {
            if token.user_id == user_id && token.revoked_at.is_none() {
                token.revoked_at = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn list_by_user(&self, user_id: Uuid) -> AuthResult<Vec<RefreshToken>> {
        Ok(self
            .tokens
            .read()
            .await
            .values()
            .filter(|t| t.user_id == user_id && t.is_active())
            .cloned()
            .collect())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.is_active());
        Ok((before - tokens.len()) as u64)
    }
}
