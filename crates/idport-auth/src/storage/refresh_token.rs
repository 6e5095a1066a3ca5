//! Refresh token storage trait.
//!
//! # Security Considerations
//!
//! - Tokens are stored as SHA-256 hashes only
//! - `consume` must be atomic so concurrent rotations of the same token
//!   resolve to exactly one winner
//! - Expired tokens may be cleaned up periodically; correctness does not
//!   depend on it

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::RefreshToken;

/// Storage trait for refresh tokens.
///
/// Implementations must ensure security properties like atomic consumption
/// and secure hash storage.
///
/// # Implementations
///
/// Implementations are provided in separate crates:
/// - `idport-auth-memory` - In-memory storage backend
#[async_trait]
pub trait RefreshTokenStorage: Send + Sync {
    /// Stores a new refresh token.
    ///
    /// # Arguments
    ///
    /// * `token` - The refresh token to store (with hashed token value)
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be stored (e.g., duplicate hash,
    /// storage unavailable).
    async fn create(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Finds a refresh token by its hash.
    ///
    /// Returns tokens regardless of expiration/revocation status; callers
    /// check `is_active()` before trusting one.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>>;

    /// Atomically consumes a token for rotation.
    ///
    /// Marks the token revoked if and only if it is not already revoked,
    /// in a single conditional operation. Under a race between two callers
    /// presenting the same token, exactly one receives `Some` and the other
    /// receives `None` (the token existed but was already revoked).
    ///
    /// # Returns
    ///
    /// - `Some(token)` - the token as it was before revocation; the caller
    ///   won the race and may mint a successor
    /// - `None` - the token exists but was already revoked; the caller
    ///   must treat this as reuse
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidGrant` if no token with this hash exists,
    /// or `AuthError::Storage` if the operation fails.
    async fn consume(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>>;

    /// Revokes a refresh token by hash. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails. Revoking an unknown
    /// or already-revoked token is not an error.
    async fn revoke(&self, token_hash: &str) -> AuthResult<()>;

    /// Revokes every token in a rotation chain.
    ///
    /// Used when reuse is detected: the whole lineage descending from one
    /// login is invalidated at once.
    ///
    /// # Returns
    ///
    /// Returns the number of tokens revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn revoke_chain(&self, chain_id: Uuid) -> AuthResult<u64>;

    /// Revokes all refresh tokens for a user.
    ///
    /// Used when a user's sessions are invalidated (password change,
    /// account compromise, account deletion).
    ///
    /// # Returns
    ///
    /// Returns the number of tokens revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn revoke_by_user(&self, user_id: Uuid) -> AuthResult<u64>;

    /// Lists all active (non-revoked, non-expired) tokens for a user.
    ///
    /// Useful for session management UI.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn list_by_user(&self, user_id: Uuid) -> AuthResult<Vec<RefreshToken>>;

    /// Deletes expired and revoked tokens.
    ///
    /// Optional maintenance; expiry is enforced lazily at use time.
    ///
    /// # Returns
    ///
    /// Returns the number of tokens deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
