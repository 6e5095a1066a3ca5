//! Storage traits for identity and authorization data.
//!
//! This module defines storage interfaces for:
//!
//! - Users and their credentials
//! - OAuth account links
//! - Refresh tokens and rotation chains
//! - OAuth CSRF state entries
//!
//! # Implementations
//!
//! Storage implementations are provided in separate crates:
//!
//! - `idport-auth-memory` - In-memory storage backend

pub mod oauth_account;
pub mod oauth_state;
pub mod refresh_token;
pub mod user;

pub use oauth_account::OAuthAccountStorage;
pub use oauth_state::OAuthStateStorage;
pub use refresh_token::RefreshTokenStorage;
pub use user::UserStorage;
