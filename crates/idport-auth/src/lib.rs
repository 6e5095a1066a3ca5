//! # idport-auth
//!
//! Identity and authorization core for the Idport SSO authority.
//!
//! This crate provides:
//! - Access/refresh token issuance with rotation and reuse detection
//! - Local password accounts (Argon2id)
//! - OAuth account linking for Google, GitHub, and Microsoft
//! - A role/scope authorization engine with role inheritance
//! - Cross-subdomain SSO sessions with return-URL validation
//!
//! ## Overview
//!
//! One authority issues short-lived RS256/RS384 access tokens and long-lived
//! opaque refresh tokens. Apps on sibling subdomains verify access tokens
//! locally against the published JWKS; the refresh token lives in an
//! `HttpOnly` cookie scoped to the shared parent domain. Refresh tokens
//! rotate on every use, and presenting an already-rotated token revokes the
//! entire chain.
//!
//! ## Modules
//!
//! - [`config`] - Authentication configuration
//! - [`token`] - Token issuance, verification, rotation, and JWKS
//! - [`account`] - Registration and password login
//! - [`password`] - Argon2id password hashing
//! - [`oauth`] - Provider clients and account linking
//! - [`authz`] - Scopes, the role graph, and the authorization engine
//! - [`sso`] - Session coordination across subdomains
//! - [`middleware`] - Axum extractors and scope enforcement
//! - [`http`] - Axum handlers for the authentication endpoints
//! - [`storage`] - Storage traits for auth-related data

pub mod account;
pub mod authz;
pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod oauth;
pub mod password;
pub mod sso;
pub mod storage;
pub mod token;
pub mod types;

pub use account::{AccountService, RegisterRequest};
pub use authz::{AccessDecision, Action, AuthorizationEngine, DenialReason, RoleGraph, Scope};
pub use config::{AuthConfig, ConfigError, CookieConfig, ProviderConfig, SsoConfig};
pub use error::{AuthError, ErrorCategory};
pub use http::{AppState, SessionResponse, router};
pub use middleware::{AuthContext, AuthState, BearerAuth, require_scope};
pub use oauth::{
    HttpProviderClient, LinkAction, LinkOutcome, LinkingConfig, OAuthLinkService, ProviderClient,
    ProviderProfile,
};
pub use sso::{LoginSession, SsoCoordinator};
pub use storage::{
    OAuthAccountStorage, OAuthStateStorage, RefreshTokenStorage, UserStorage,
};
pub use token::{
    AccessTokenClaims, Jwks, JwtService, SigningAlgorithm, SigningKeyPair, TokenPair,
    TokenService, TokenServiceConfig,
};
pub use types::{OAuthAccount, Provider, RefreshToken, User};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use idport_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::account::{AccountService, RegisterRequest};
    pub use crate::authz::{AccessDecision, Action, AuthorizationEngine, RoleGraph, Scope};
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{AppState, router};
    pub use crate::middleware::{AuthContext, AuthState, BearerAuth, require_scope};
    pub use crate::oauth::{LinkingConfig, OAuthLinkService, ProviderClient};
    pub use crate::sso::{LoginSession, SsoCoordinator};
    pub use crate::storage::{
        OAuthAccountStorage, OAuthStateStorage, RefreshTokenStorage, UserStorage,
    };
    pub use crate::token::{AccessTokenClaims, JwtService, TokenPair, TokenService};
    pub use crate::types::{OAuthAccount, Provider, RefreshToken, User};
}
