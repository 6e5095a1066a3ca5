//! OAuth CSRF state storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::oauth::state::OAuthState;

/// Storage trait for pending OAuth authorizations.
///
/// Entries are one-time: `consume` removes the entry so the same `state`
/// value can never complete two callbacks.
#[async_trait]
pub trait OAuthStateStorage: Send + Sync {
    /// Stores a new state entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn create(&self, entry: &OAuthState) -> AuthResult<()>;

    /// Atomically removes and returns the entry for `state`.
    ///
    /// Returns `None` if no entry exists (never issued, already consumed,
    /// or purged after expiry). Implementations may return expired entries;
    /// callers check `is_expired()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn consume(&self, state: &str) -> AuthResult<Option<OAuthState>>;

    /// Deletes expired entries.
    ///
    /// # Returns
    ///
    /// Returns the number of entries deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
