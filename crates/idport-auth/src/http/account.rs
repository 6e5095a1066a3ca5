//! Account and session endpoint handlers.
//!
//! Registration, password login, refresh rotation, logout, and access token
//! validation. Login and refresh set the cross-domain refresh cookie; the
//! access token only ever travels in the JSON body.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;
use crate::sso::LoginSession;
use crate::types::User;

use super::AppState;

// =============================================================================
// Wire Types
// =============================================================================

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    /// Email address.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Email address.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// Request body for `POST /auth/refresh` and `POST /auth/logout`.
///
/// The refresh token may come from the body or from the refresh cookie;
/// the body wins when both are present.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPayload {
    /// Opaque refresh token.
    pub refresh_token: Option<String>,
}

/// Request body for `POST /auth/validate`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePayload {
    /// Access token to verify.
    pub token: Option<String>,
}

/// Successful login/refresh response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Signed access token.
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// New refresh token, echoed in the body for clients that do not use
    /// the cookie. Set on refresh only; login delivers it via cookie.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Handler for `POST /auth/register`.
///
/// Returns 201 with the created user, 409 on a duplicate email, or 422 on
/// invalid input.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<User>), AuthError> {
    let user = state
        .accounts
        .register(crate::account::RegisterRequest {
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Handler for `POST /auth/login`.
///
/// Returns 200 with an access token and the refresh cookie, or a uniform
/// 401 on any credential failure.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AuthError> {
    let user = state
        .accounts
        .authenticate(&payload.email, &payload.password)
        .await?;

    let session = state
        .sso
        .complete_login(user.id, &user.role, Some(&user.email))
        .await?;

    tracing::info!(user_id = %user.id, "Password login");
    Ok(session_response(StatusCode::OK, session, None))
}

/// Handler for `POST /auth/refresh`.
///
/// Rotates the refresh token taken from the body or the refresh cookie.
/// Returns 200 with a new token pair and cookie, or 401 when the token is
/// unknown, expired, or already rotated.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<Response, AuthError> {
    let token = refresh_token_from(&jar, &body, state.sso.cookie_name())?
        .ok_or_else(|| AuthError::invalid_grant("Missing refresh token"))?;

    // The new access token carries the user's current role, so a role
    // change takes effect on the next refresh.
    let user_id = state.tokens.refresh_token_owner(&token).await?;
    let user = state
        .accounts
        .get_active(user_id)
        .await?
        .ok_or_else(|| AuthError::invalid_grant("Session owner is not active"))?;

    let pair = state
        .tokens
        .rotate_refresh_token(&token, &user.role, Some(&user.email))
        .await?;
    let refresh_token = pair.refresh_token.clone();
    let session = state.sso.session_from_pair(pair);

    Ok(session_response(StatusCode::OK, session, Some(refresh_token)))
}

/// Handler for `POST /auth/logout`.
///
/// Revokes the refresh token and clears the cookie. Always returns 204;
/// logging out an already-dead session is not an error.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<Response, AuthError> {
    let clear_cookie = match refresh_token_from(&jar, &body, state.sso.cookie_name())? {
        Some(token) => state.sso.logout(&token).await?,
        None => state.sso.build_clear_cookie(),
    };

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_cookie)],
    )
        .into_response())
}

/// Handler for `POST /auth/validate`.
///
/// Verifies an access token taken from the body or the `Authorization`
/// header and returns its claims. Verification is stateless: signature,
/// expiry, and issuer only.
pub async fn validate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AuthError> {
    let token = access_token_from(&headers, &body)?
        .ok_or_else(|| AuthError::invalid_token("Missing access token"))?;

    let claims = state.tokens.verify_access_token(&token)?;
    Ok(Json(claims).into_response())
}

// =============================================================================
// Helpers
// =============================================================================

fn session_response(
    status: StatusCode,
    session: LoginSession,
    refresh_token: Option<String>,
) -> Response {
    (
        status,
        [(header::SET_COOKIE, session.refresh_cookie)],
        Json(SessionResponse {
            access_token: session.access_token,
            token_type: "Bearer",
            expires_in: session.expires_in,
            refresh_token,
        }),
    )
        .into_response()
}

/// Pulls the refresh token out of the request body, falling back to the
/// refresh cookie.
///
/// # Errors
///
/// Returns `AuthError::Validation` if the body is present but not valid
/// JSON.
fn refresh_token_from(
    jar: &CookieJar,
    body: &[u8],
    cookie_name: &str,
) -> AuthResult<Option<String>> {
    let from_body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<RefreshPayload>(body)
            .map_err(|_| AuthError::validation("Request body is not valid JSON"))?
            .refresh_token
    };

    Ok(from_body.or_else(|| jar.get(cookie_name).map(|c| c.value().to_string())))
}

fn access_token_from(headers: &HeaderMap, body: &[u8]) -> AuthResult<Option<String>> {
    let from_body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<ValidatePayload>(body)
            .map_err(|_| AuthError::validation("Request body is not valid JSON"))?
            .token
    };

    Ok(from_body.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cookie::Cookie;

    #[test]
    fn test_refresh_token_prefers_body_over_cookie() {
        let jar = CookieJar::new().add(Cookie::new("idport_refresh", "cookie-token"));
        let body = br#"{"refreshToken":"body-token"}"#;

        let token = refresh_token_from(&jar, body, "idport_refresh").unwrap();
        assert_eq!(token.as_deref(), Some("body-token"));
    }

    #[test]
    fn test_refresh_token_falls_back_to_cookie() {
        let jar = CookieJar::new().add(Cookie::new("idport_refresh", "cookie-token"));

        let token = refresh_token_from(&jar, b"", "idport_refresh").unwrap();
        assert_eq!(token.as_deref(), Some("cookie-token"));

        // Body present but without the field also falls back
        let token = refresh_token_from(&jar, b"{}", "idport_refresh").unwrap();
        assert_eq!(token.as_deref(), Some("cookie-token"));
    }

    #[test]
    fn test_refresh_token_absent() {
        let jar = CookieJar::new();
        let token = refresh_token_from(&jar, b"", "idport_refresh").unwrap();
        assert!(token.is_none());
    }

    #[test]
    fn test_refresh_token_rejects_malformed_body() {
        let jar = CookieJar::new();
        let err = refresh_token_from(&jar, b"not json", "idport_refresh").unwrap_err();
        assert!(matches!(err, AuthError::Validation { .. }));
    }

    #[test]
    fn test_access_token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc123".parse().unwrap());

        let token = access_token_from(&headers, b"").unwrap();
        assert_eq!(token.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_access_token_body_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer header-token".parse().unwrap());

        let token = access_token_from(&headers, br#"{"token":"body-token"}"#).unwrap();
        assert_eq!(token.as_deref(), Some("body-token"));
    }
}
