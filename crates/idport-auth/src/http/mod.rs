//! HTTP handlers for the authentication endpoints.
//!
//! This module provides Axum handlers and a router for the public surface:
//!
//! - `POST /auth/register` — create a password account
//! - `POST /auth/login` — password login, sets the refresh cookie
//! - `POST /auth/refresh` — rotate the refresh token (body or cookie)
//! - `POST /auth/logout` — revoke the refresh token, clear the cookie
//! - `POST /auth/validate` — verify an access token and return its claims
//! - `GET /auth/oauth/{provider}` — start an OAuth flow
//! - `GET /auth/oauth/{provider}/callback` — complete an OAuth flow
//! - `GET /auth/jwks` (also `/.well-known/jwks.json`) — public signing keys

pub mod account;
pub mod jwks;
pub mod oauth;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AuthResult;
use crate::account::AccountService;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::linking::{LinkingConfig, OAuthLinkService};
use crate::oauth::provider::{HttpProviderClient, ProviderClient};
use crate::sso::SsoCoordinator;
use crate::storage::oauth_account::OAuthAccountStorage;
use crate::storage::oauth_state::OAuthStateStorage;
use crate::storage::refresh_token::RefreshTokenStorage;
use crate::storage::user::UserStorage;
use crate::token::jwt::{JwtService, SigningAlgorithm, SigningKeyPair};
use crate::token::service::{TokenService, TokenServiceConfig};

pub use account::{
    LoginRequest, RegisterPayload, SessionResponse, login_handler, logout_handler,
    refresh_handler, register_handler, validate_handler,
};
pub use jwks::jwks_handler;
pub use oauth::{oauth_callback_handler, oauth_initiate_handler};

/// Shared state for the authentication endpoints.
#[derive(Clone)]
pub struct AppState {
    /// Local account service (register, password login).
    pub accounts: Arc<AccountService>,

    /// Token service (verification, rotation, JWKS).
    pub tokens: Arc<TokenService>,

    /// SSO coordinator (return URLs, cookies, login sessions).
    pub sso: Arc<SsoCoordinator>,

    /// OAuth linking service (provider flows).
    pub linking: Arc<OAuthLinkService>,
}

impl AppState {
    /// Creates the application state.
    #[must_use]
    pub fn new(
        accounts: Arc<AccountService>,
        tokens: Arc<TokenService>,
        sso: Arc<SsoCoordinator>,
        linking: Arc<OAuthLinkService>,
    ) -> Self {
        Self {
            accounts,
            tokens,
            sso,
            linking,
        }
    }

    /// Builds the full service graph from a configuration.
    ///
    /// This is the composition root: the issuer, token lifetimes, signing
    /// key, cookie and SSO settings, OAuth state lifetime, and the set of
    /// enabled providers all come from `config`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the configuration fails
    /// validation or the signing key cannot be prepared.
    pub fn from_config(
        config: &AuthConfig,
        users: Arc<dyn UserStorage>,
        oauth_accounts: Arc<dyn OAuthAccountStorage>,
        refresh_tokens: Arc<dyn RefreshTokenStorage>,
        oauth_states: Arc<dyn OAuthStateStorage>,
    ) -> AuthResult<Self> {
        config
            .validate()
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let algorithm = SigningAlgorithm::parse(&config.signing.algorithm)
            .map_err(|e| AuthError::configuration(e.to_string()))?;
        let key_pair = match (
            &config.signing.private_key_pem,
            &config.signing.public_key_pem,
        ) {
            (Some(private_pem), Some(public_pem)) => {
                // The kid must be stable across restarts so verifiers that
                // cached the JWKS keep matching it.
                let kid = {
                    use sha2::{Digest, Sha256};
                    hex::encode(&Sha256::digest(public_pem.as_bytes())[..8])
                };
                SigningKeyPair::from_pem(kid, algorithm, private_pem, public_pem)
            }
            _ => SigningKeyPair::generate_rsa(algorithm),
        }
        .map_err(|e| AuthError::configuration(e.to_string()))?;

        let jwt_service = Arc::new(JwtService::new(key_pair, &config.issuer));
        let tokens = Arc::new(TokenService::new(
            jwt_service,
            refresh_tokens.clone(),
            TokenServiceConfig::from_lifetimes(&config.issuer, &config.token),
        ));

        let accounts = Arc::new(AccountService::new(users.clone(), refresh_tokens));

        let sso = Arc::new(SsoCoordinator::new(
            tokens.clone(),
            config.sso.clone(),
            config.cookie.clone(),
        ));

        let mut clients: Vec<Arc<dyn ProviderClient>> = Vec::new();
        for provider in config.providers.iter().filter(|p| p.enabled) {
            clients.push(Arc::new(HttpProviderClient::new(provider.clone())?));
        }

        let linking = Arc::new(OAuthLinkService::new(
            clients,
            oauth_states,
            users,
            oauth_accounts,
            LinkingConfig::default().with_state_lifetime(config.token.oauth_state_lifetime),
        ));

        Ok(Self {
            accounts,
            tokens,
            sso,
            linking,
        })
    }
}

/// Builds the router exposing every authentication endpoint.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/refresh", post(refresh_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/validate", post(validate_handler))
        .route("/auth/oauth/{provider}", get(oauth_initiate_handler))
        .route(
            "/auth/oauth/{provider}/callback",
            get(oauth_callback_handler),
        )
        .route("/auth/jwks", get(jwks_handler))
        .route("/.well-known/jwks.json", get(jwks_handler))
        .with_state(state)
}
