//! Local account management: registration and password authentication.
//!
//! # Security
//!
//! Authentication failures return the same `InvalidCredentials` error
//! whether the email is unknown or the password is wrong, so responses
//! cannot be used to enumerate accounts.

use std::sync::Arc;

use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::password::{self, MIN_PASSWORD_LENGTH};
use crate::storage::refresh_token::RefreshTokenStorage;
use crate::storage::user::UserStorage;
use crate::types::User;

/// Registration input.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    /// Email address (normalized before storage).
    pub email: String,
    /// Plaintext password, hashed before storage.
    pub password: String,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
}

/// Service for local password accounts.
pub struct AccountService {
    user_storage: Arc<dyn UserStorage>,
    refresh_token_storage: Arc<dyn RefreshTokenStorage>,
}

impl AccountService {
    /// Creates an account service.
    #[must_use]
    pub fn new(
        user_storage: Arc<dyn UserStorage>,
        refresh_token_storage: Arc<dyn RefreshTokenStorage>,
    ) -> Self {
        Self {
            user_storage,
            refresh_token_storage,
        }
    }

    /// Registers a new password account with the default `user` role.
    ///
    /// # Errors
    ///
    /// - `AuthError::Validation` for a malformed email or short password
    /// - `AuthError::Conflict` if the email is already registered
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<User> {
        let email = User::normalize_email(&request.email);
        validate_email(&email)?;
        validate_password(&request.password)?;

        if self.user_storage.find_by_email(&email).await?.is_some() {
            return Err(AuthError::conflict("Email already registered"));
        }

        let password_hash = password::hash_password(&request.password)
            .map_err(|e| AuthError::internal(format!("Password hashing failed: {}", e)))?;

        let mut builder = User::builder(&email).with_password_hash(password_hash);
        if let Some(first_name) = request.first_name {
            builder = builder.with_first_name(first_name);
        }
        if let Some(last_name) = request.last_name {
            builder = builder.with_last_name(last_name);
        }
        let user = builder.build();

        self.user_storage.create(&user).await?;
        tracing::info!(user_id = %user.id, "Registered new account");
        Ok(user)
    }

    /// Authenticates a password login.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email, a
    /// wrong password, an OAuth-only account, or a soft-deleted account.
    /// The error carries no distinguishing detail.
    pub async fn authenticate(&self, email: &str, password: &str) -> AuthResult<User> {
        let email = User::normalize_email(email);

        let user = self
            .user_storage
            .find_by_email(&email)
            .await?
            .filter(User::is_active)
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;

        let matches = password::verify_password(password, hash)
            .map_err(|e| AuthError::internal(format!("Password verification failed: {}", e)))?;
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Loads an active (non-deleted) user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn get_active(&self, user_id: Uuid) -> AuthResult<Option<User>> {
        Ok(self
            .user_storage
            .find_by_id(user_id)
            .await?
            .filter(User::is_active))
    }

    /// Changes a user's password and revokes every open session.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidCredentials` if the current password is wrong
    /// - `AuthError::Validation` if the new password is too short
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        validate_password(new_password)?;

        let mut user = self
            .user_storage
            .find_by_id(user_id)
            .await?
            .filter(User::is_active)
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        let matches = password::verify_password(current_password, hash)
            .map_err(|e| AuthError::internal(format!("Password verification failed: {}", e)))?;
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        user.password_hash = Some(
            password::hash_password(new_password)
                .map_err(|e| AuthError::internal(format!("Password hashing failed: {}", e)))?,
        );
        user.updated_at = time::OffsetDateTime::now_utc();
        self.user_storage.update(&user).await?;

        // A password change invalidates every open session.
        let revoked = self.refresh_token_storage.revoke_by_user(user_id).await?;
        tracing::info!(
            user_id = %user_id,
            revoked_count = revoked,
            "Password changed, sessions revoked"
        );

        Ok(())
    }
}

fn validate_email(email: &str) -> AuthResult<()> {
    // Storage-level sanity, not full RFC 5322
    let valid = email.len() >= 3
        && email.len() <= 254
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty() && !domain.is_empty() && domain.contains('.')
        });

    if valid {
        Ok(())
    } else {
        Err(AuthError::validation("Invalid email address"))
    }
}

fn validate_password(password: &str) -> AuthResult<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RefreshToken;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    struct MemoryUserStorage {
        users: RwLock<HashMap<Uuid, User>>,
    }

    #[async_trait]
    impl UserStorage for MemoryUserStorage {
        async fn create(&self, user: &User) -> AuthResult<()> {
            let mut users = self.users.write().await;
            if users.values().any(|u| u.email == user.email) {
                return Err(AuthError::conflict("Email already registered"));
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
            self.users.write().await.insert(user.id, user.clone());
            Ok(())
        }
    }

    struct CountingTokenStorage {
        revoked_users: RwLock<Vec<Uuid>>,
    }

    #[async_trait]
    impl RefreshTokenStorage for CountingTokenStorage {
        async fn create(&self, _token: &RefreshToken) -> AuthResult<()> {
            Ok(())
        }
        async fn find_by_hash(&self, _hash: &str) -> AuthResult<Option<RefreshToken>> {
            Ok(None)
        }
        async fn consume(&self, _hash: &str) -> AuthResult<Option<RefreshToken>> {
            Err(AuthError::invalid_grant("Unknown refresh token"))
        }
        async fn revoke(&self, _hash: &str) -> AuthResult<()> {
            Ok(())
        }
        async fn revoke_chain(&self, _chain_id: Uuid) -> AuthResult<u64> {
            Ok(0)
        }
        async fn revoke_by_user(&self, user_id: Uuid) -> AuthResult<u64> {
            self.revoked_users.write().await.push(user_id);
            Ok(1)
        }
        async fn list_by_user(&self, _user_id: Uuid) -> AuthResult<Vec<RefreshToken>> {
            Ok(Vec::new())
        }
        async fn cleanup_expired(&self) -> AuthResult<u64> {
            Ok(0)
        }
    }

    fn build_service() -> (AccountService, Arc<CountingTokenStorage>) {
        let tokens = Arc::new(CountingTokenStorage {
            revoked_users: RwLock::new(Vec::new()),
        });
        let service = AccountService::new(
            Arc::new(MemoryUserStorage {
                users: RwLock::new(HashMap::new()),
            }),
            tokens.clone(),
        );
        (service, tokens)
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "password123".to_string(),
            first_name: Some("Alice".to_string()),
            last_name: None,
        }
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let (service, _) = build_service();

        let user = service
            .register(register_request("Alice@Example.com"))
            .await
            .unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.role, "user");

        let authed = service
            .authenticate("alice@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(authed.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (service, _) = build_service();
        service.register(register_request("a@b.com")).await.unwrap();

        let err = service
            .register(register_request("A@B.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let (service, _) = build_service();

        let mut request = register_request("not-an-email");
        assert!(service.register(request.clone()).await.is_err());

        request = register_request("a@b.com");
        request.password = "short".to_string();
        assert!(matches!(
            service.register(request).await.unwrap_err(),
            AuthError::Validation { .. }
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_identical() {
        let (service, _) = build_service();
        service.register(register_request("a@b.com")).await.unwrap();

        let wrong_password = service
            .authenticate("a@b.com", "not-the-password")
            .await
            .unwrap_err();
        let unknown_email = service
            .authenticate("ghost@b.com", "password123")
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_change_password_revokes_sessions() {
        let (service, tokens) = build_service();
        let user = service.register(register_request("a@b.com")).await.unwrap();

        service
            .change_password(user.id, "password123", "newpassword456")
            .await
            .unwrap();

        assert_eq!(tokens.revoked_users.read().await.as_slice(), &[user.id]);

        // Old password no longer works, new one does
        assert!(service.authenticate("a@b.com", "password123").await.is_err());
        assert!(
            service
                .authenticate("a@b.com", "newpassword456")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let (service, _) = build_service();
        let user = service.register(register_request("a@b.com")).await.unwrap();

        let err = service
            .change_password(user.id, "wrong-current", "newpassword456")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }
}
