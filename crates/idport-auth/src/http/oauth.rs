//! OAuth flow endpoint handlers.
//!
//! The initiate handler validates the return URL against the SSO allow-list
//! before any state is written, then redirects to the provider. The callback
//! handler completes the link, establishes a session, and redirects back to
//! the bound return URL with the refresh cookie set. Callback failures render
//! a minimal error page instead of JSON since the caller is a browser.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use crate::error::AuthError;
use crate::types::Provider;

use super::AppState;

// =============================================================================
// Wire Types
// =============================================================================

/// Query parameters for `GET /auth/oauth/{provider}`.
#[derive(Debug, Deserialize)]
pub struct InitiateQuery {
    /// Where to send the browser after a successful login.
    pub return_url: String,
}

/// Query parameters for `GET /auth/oauth/{provider}/callback`.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code from the provider.
    pub code: String,
    /// State value issued at initiation.
    pub state: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Handler for `GET /auth/oauth/{provider}`.
///
/// Validates the return URL, stores a state entry bound to it, and returns
/// a 302 redirect to the provider's authorization endpoint.
pub async fn oauth_initiate_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<InitiateQuery>,
) -> Result<Response, AuthError> {
    let provider: Provider = provider.parse()?;

    // Open-redirect guard runs before any state is persisted.
    state.sso.start_login(&query.return_url)?;

    let url = state.linking.initiate(provider, &query.return_url).await?;
    Ok(found(url.as_str(), None))
}

/// Handler for `GET /auth/oauth/{provider}/callback`.
///
/// Completes the flow: verifies the state, resolves the provider identity
/// to a local user, issues a session, and redirects to the return URL with
/// the refresh cookie. Any failure renders an error page.
pub async fn oauth_callback_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    match complete_callback(&state, &provider, &query).await {
        Ok(response) => response,
        Err(error) => error_page(&error),
    }
}

async fn complete_callback(
    state: &AppState,
    provider: &str,
    query: &CallbackQuery,
) -> Result<Response, AuthError> {
    let provider: Provider = provider.parse()?;

    let outcome = state
        .linking
        .handle_callback(provider, &query.code, &query.state)
        .await?;

    // The allow-list may have changed since initiation.
    state.sso.start_login(&outcome.return_url)?;

    let session = state
        .sso
        .complete_login(
            outcome.user.id,
            &outcome.user.role,
            Some(&outcome.user.email),
        )
        .await?;

    tracing::info!(
        user_id = %outcome.user.id,
        provider = %provider,
        action = ?outcome.action,
        "OAuth login"
    );

    Ok(found(&outcome.return_url, Some(session.refresh_cookie)))
}

// =============================================================================
// Helpers
// =============================================================================

/// Builds a 302 response, optionally carrying a `Set-Cookie` header.
fn found(location: &str, cookie: Option<String>) -> Response {
    let mut response =
        (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response();

    if let Some(cookie) = cookie {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

/// Renders the browser-facing error page for a failed callback.
///
/// Only the stable error code appears on the page; messages can embed
/// request-controlled strings and must not reach the markup.
fn error_page(error: &AuthError) -> Response {
    let status = StatusCode::from_u16(error.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    tracing::warn!(error = %error, category = %error.category(), "OAuth callback failed");

    let body = format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Sign-in failed</title></head>\n\
         <body>\n<h1>Sign-in failed</h1>\n\
         <p>The login could not be completed ({}). Close this window and try again.</p>\n\
         </body>\n</html>\n",
        error.error_code()
    );

    (status, Html(body)).into_response()
}
