//! In-memory storage backend for idport-auth.
//!
//! Provides non-persistent implementations of every storage trait:
//!
//! - Users ([`MemoryUserStorage`])
//! - OAuth account links ([`MemoryOAuthAccountStorage`])
//! - Refresh tokens ([`MemoryRefreshTokenStorage`])
//! - OAuth CSRF state entries ([`MemoryOAuthStateStorage`])
//!
//! Suitable for tests and single-node development setups; everything is
//! lost on restart. Each store is a `tokio::sync::RwLock` over a `HashMap`,
//! and the conditional operations (`consume`) run under the write lock so
//! the atomicity contracts hold.
//!
//! # Example
//!
//! ```ignore
//! use idport_auth_memory::MemoryAuthStorage;
//!
//! let storage = MemoryAuthStorage::new();
//! let users = storage.users();
//! let tokens = storage.refresh_tokens();
//! ```

pub mod oauth_account;
pub mod oauth_state;
pub mod refresh_token;
pub mod user;

use std::sync::Arc;

pub use oauth_account::MemoryOAuthAccountStorage;
pub use oauth_state::MemoryOAuthStateStorage;
pub use refresh_token::MemoryRefreshTokenStorage;
pub use user::MemoryUserStorage;

/// In-memory storage backend bundling every store.
#[derive(Clone, Default)]
pub struct MemoryAuthStorage {
    users: Arc<MemoryUserStorage>,
    oauth_accounts: Arc<MemoryOAuthAccountStorage>,
    refresh_tokens: Arc<MemoryRefreshTokenStorage>,
    oauth_states: Arc<MemoryOAuthStateStorage>,
}

impl MemoryAuthStorage {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// User storage.
    #[must_use]
    pub fn users(&self) -> Arc<MemoryUserStorage> {
        Arc::clone(&self.users)
    }

    /// OAuth account link storage.
    #[must_use]
    pub fn oauth_accounts(&self) -> Arc<MemoryOAuthAccountStorage> {
        Arc::clone(&self.oauth_accounts)
    }

    /// Refresh token storage.
    #[must_use]
    pub fn refresh_tokens(&self) -> Arc<MemoryRefreshTokenStorage> {
        Arc::clone(&self.refresh_tokens)
    }

    /// OAuth state storage.
    #[must_use]
    pub fn oauth_states(&self) -> Arc<MemoryOAuthStateStorage> {
        Arc::clone(&self.oauth_states)
    }
}
