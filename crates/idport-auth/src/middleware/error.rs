//! Error response handling for the HTTP boundary.
//!
//! This module implements `IntoResponse` for `AuthError` so handlers and
//! extractors can return errors directly. Bodies carry a stable error code
//! plus a message; every 401 body is identical so responses cannot be used
//! to probe which check failed.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if self.is_security_anomaly() {
            tracing::warn!(error = %self, category = %self.category(), "Security anomaly");
        } else if self.is_server_error() {
            tracing::error!(error = %self, category = %self.category(), "Request failed");
        }

        let body = Json(error_body(&self, status));

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(self.error_code());
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        (status, headers, body).into_response()
    }
}

/// Builds the JSON error body for a response.
///
/// 401 bodies are uniform, and 5xx bodies never carry internal detail;
/// everything else reports the real code and message.
#[must_use]
pub fn error_body(error: &AuthError, status: StatusCode) -> serde_json::Value {
    let (code, message) = if status == StatusCode::UNAUTHORIZED {
        ("unauthorized".to_string(), "Authentication failed".to_string())
    } else if status == StatusCode::BAD_GATEWAY {
        (
            error.error_code().to_string(),
            "Identity provider error".to_string(),
        )
    } else if status.is_server_error() {
        (
            error.error_code().to_string(),
            "Internal server error".to_string(),
        )
    } else {
        (error.error_code().to_string(), error.to_string())
    };

    json!({
        "error": code,
        "message": message,
    })
}

/// Builds the `WWW-Authenticate` header value for 401 responses.
///
/// Format: `Bearer realm="idport", error="invalid_token"`
fn build_www_authenticate_header(error_code: &str) -> String {
    format!("Bearer realm=\"idport\", error=\"{}\"", error_code)
}

// =============================================================================
// Tests
// =============================================================================
