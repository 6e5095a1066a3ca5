//! User storage trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::User;

/// Storage trait for user accounts.
///
/// Email lookup is case-insensitive: implementations receive emails already
/// normalized by [`User::normalize_email`] and must compare against the
/// normalized stored value.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Stores a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Conflict` if a user with the same email already
    /// exists, or `AuthError::Storage` if the operation fails.
    async fn create(&self, user: &User) -> AuthResult<()>;

    /// Finds a user by id.
    ///
    /// Returns soft-deleted users too; callers check `is_active()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>>;

    /// Finds a user by normalized email.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Updates an existing user, bumping `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the user does not exist or the
    /// operation fails.
    async fn update(&self, user: &User) -> AuthResult<()>;
}
