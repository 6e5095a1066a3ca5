//! In-memory user storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use idport_auth::storage::UserStorage;
use idport_auth::types::User;
use idport_auth::{AuthError, AuthResult};

/// In-memory implementation of [`UserStorage`].
///
/// Emails are stored normalized by the caller, so uniqueness is a plain
/// equality check.
#[derive(Default)]
pub struct MemoryUserStorage {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users (including soft-deleted ones).
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Returns `true` if no users are stored.
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStorage for MemoryUserStorage {
    async fn create(&self, user: &User) -> AuthResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(AuthError::conflict("Email already registered"));
        }
        if users.contains_key(&user.id) {
            return Err(AuthError::conflict("User id already exists"));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(AuthError::storage("User not found"));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find() {
        let storage = MemoryUserStorage::new();
        let user = User::builder("alice@example.com").build();

        storage.create(&user).await.unwrap();

        let by_id = storage.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "alice@example.com");

        let by_email = storage
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let storage = MemoryUserStorage::new();
        storage
            .create(&User::builder("a@b.com").build())
            .await
            .unwrap();

        let err = storage
            .create(&User::builder("a@b.com").build())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_update_requires_existing() {
        let storage = MemoryUserStorage::new();
        let mut user = User::builder("a@b.com").build();

        assert!(storage.update(&user).await.is_err());

        storage.create(&user).await.unwrap();
        user.email_verified = true;
        storage.update(&user).await.unwrap();

        let stored = storage.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.email_verified);
    }
}
