//! Core domain types.

pub mod oauth_account;
pub mod refresh_token;
pub mod user;

pub use oauth_account::{OAuthAccount, Provider};
pub use refresh_token::RefreshToken;
pub use user::{User, UserBuilder};
