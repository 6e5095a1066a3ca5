//! Bearer token authentication and scope enforcement for Axum handlers.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware::from_fn_with_state, routing::get};
//! use idport_auth::middleware::{AuthState, BearerAuth, require_scope};
//!
//! async fn list_users(BearerAuth(auth): BearerAuth) -> String {
//!     format!("Hello, {}!", auth.claims.sub)
//! }
//!
//! let app = Router::new()
//!     .route("/users", get(list_users))
//!     .layer(from_fn_with_state(
//!         (auth_state.clone(), "users:read"),
//!         require_scope,
//!     ))
//!     .with_state(auth_state);
//! ```

pub mod error;

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, header::COOKIE, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::authz::engine::AuthorizationEngine;
use crate::error::AuthError;
use crate::token::jwt::AccessTokenClaims;
use crate::token::service::TokenService;

// =============================================================================
// Auth State
// =============================================================================

/// State required for bearer token authentication.
///
/// Include this in your application state and expose it to the extractors
/// via `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    /// Token service for access token verification.
    pub token_service: Arc<TokenService>,

    /// Authorization engine for scope checks.
    pub engine: AuthorizationEngine,

    /// Name of the cookie that may carry an access token for browser flows.
    pub access_cookie_name: Option<String>,
}

impl AuthState {
    /// Creates a new auth state.
    #[must_use]
    pub fn new(token_service: Arc<TokenService>, engine: AuthorizationEngine) -> Self {
        Self {
            token_service,
            engine,
            access_cookie_name: None,
        }
    }

    /// Enables reading the access token from a cookie as a fallback to the
    /// `Authorization` header.
    #[must_use]
    pub fn with_access_cookie(mut self, name: impl Into<String>) -> Self {
        self.access_cookie_name = Some(name.into());
        self
    }
}

// =============================================================================
// Auth Context
// =============================================================================

/// Verified identity attached to a request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Verified access token claims.
    pub claims: AccessTokenClaims,
}

impl AuthContext {
    /// The authenticated user's id.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the subject claim is not a UUID.
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        self.claims
            .sub
            .parse()
            .map_err(|_| AuthError::invalid_token("Subject claim is not a user id"))
    }

    /// Checks a required scope against this identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Forbidden` when the scope is not covered.
    pub fn require_scope(&self, engine: &AuthorizationEngine, scope: &str) -> Result<(), AuthError> {
        if engine.authorize_str(&self.claims, scope).is_granted() {
            Ok(())
        } else {
            Err(AuthError::forbidden(format!(
                "Missing required scope: {}",
                scope
            )))
        }
    }
}

// =============================================================================
// Bearer Auth Extractor
// =============================================================================

/// Axum extractor that validates a bearer token.
///
/// Reads `Authorization: Bearer <token>` first, then the configured access
/// cookie. Verification is signature + expiry + issuer; rejections map to
/// 401 through `AuthError`'s `IntoResponse`.
pub struct BearerAuth(pub AuthContext);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let token = extract_bearer_token(parts, &auth_state)
            .ok_or_else(|| AuthError::invalid_token("Missing bearer token"))?;

        let claims = auth_state.token_service.verify_access_token(&token)?;
        Ok(BearerAuth(AuthContext { claims }))
    }
}

fn extract_bearer_token(parts: &Parts, state: &AuthState) -> Option<String> {
    if let Some(header) = parts.headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) {
        if let Some(token) = header.strip_prefix("Bearer ").filter(|t| !t.is_empty()) {
            return Some(token.to_string());
        }
    }

    let cookie_name = state.access_cookie_name.as_deref()?;
    for header in parts.headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else { continue };
        for pair in value.split(';') {
            if let Some((name, token)) = pair.trim().split_once('=') {
                if name == cookie_name && !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }
    None
}

// =============================================================================
// Scope Middleware
// =============================================================================

/// Middleware enforcing a required scope on every request it wraps.
///
/// Verifies the bearer token (401 on failure), checks the scope against the
/// authorization engine (403 on denial), and attaches the [`AuthContext`]
/// as a request extension for downstream handlers.
///
/// Use with `axum::middleware::from_fn_with_state`, passing the auth state
/// paired with the scope string.
pub async fn require_scope(
    State((auth_state, scope)): State<(AuthState, &'static str)>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let (mut parts, body) = request.into_parts();
    let BearerAuth(context) = BearerAuth::from_request_parts(&mut parts, &auth_state).await?;

    context.require_scope(&auth_state.engine, scope)?;

    request = Request::from_parts(parts, body);
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

impl FromRef<(AuthState, &'static str)> for AuthState {
    fn from_ref(state: &(AuthState, &'static str)) -> Self {
        state.0.clone()
    }
}
