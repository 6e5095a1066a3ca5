//! JWKS endpoint handler.
//!
//! Publishes the public signing keys so apps on other subdomains can verify
//! access tokens locally without calling `/auth/validate`.

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use super::AppState;

/// Handler for `GET /auth/jwks` and `GET /.well-known/jwks.json`.
///
/// Returns 200 with the JWKS document. Keys rotate rarely, so the response
/// allows caching for an hour.
pub async fn jwks_handler(State(state): State<AppState>) -> impl IntoResponse {
    let jwks = state.tokens.jwks();
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        Json(jwks),
    )
}
