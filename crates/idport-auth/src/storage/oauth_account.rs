//! OAuth account link storage trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::{OAuthAccount, Provider};

/// Storage trait for OAuth account links.
///
/// Implementations must enforce that `(provider, provider_user_id)` is
/// globally unique.
#[async_trait]
pub trait OAuthAccountStorage: Send + Sync {
    /// Stores a new account link.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Conflict` if the `(provider, provider_user_id)`
    /// pair is already linked, or `AuthError::Storage` if the operation
    /// fails.
    async fn create(&self, account: &OAuthAccount) -> AuthResult<()>;

    /// Finds a link by provider identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_provider_identity(
        &self,
        provider: Provider,
        provider_user_id: &str,
    ) -> AuthResult<Option<OAuthAccount>>;

    /// Lists all links for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_by_user(&self, user_id: Uuid) -> AuthResult<Vec<OAuthAccount>>;

    /// Deletes a link.
    ///
    /// The caller is responsible for the credential-count guard: a user
    /// must retain at least one credential after the unlink.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the link does not exist or the
    /// operation fails.
    async fn delete(&self, user_id: Uuid, provider: Provider) -> AuthResult<()>;
}
