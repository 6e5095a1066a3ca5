//! Authentication and authorization error types.
//!
//! This module defines all error types that can occur during authentication
//! and authorization operations. Every token-validity decision fails closed:
//! when in doubt, the caller receives an error, never an implicit grant.

use std::fmt;

/// Errors that can occur during authentication and authorization operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request payload is malformed or fails validation rules.
    #[error("Validation error: {message}")]
    Validation {
        /// Description of what failed validation.
        message: String,
    },

    /// The presented credentials do not match any active account.
    ///
    /// The message is intentionally uniform regardless of whether the email
    /// exists, the account is OAuth-only, or the password is wrong, to
    /// prevent account enumeration.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The access token is invalid, malformed, or cannot be parsed.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The access token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// The token signature does not verify against the service public key.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The refresh token is invalid, expired, or unknown.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// A previously rotated refresh token was presented again.
    ///
    /// This is treated as theft evidence: the whole rotation chain is
    /// revoked before this error is returned.
    #[error("Refresh token reuse detected")]
    ReuseDetected,

    /// The OAuth callback `state` does not match any issued value.
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// The authenticated identity lacks the required scope.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description of why access is forbidden.
        message: String,
    },

    /// The operation conflicts with existing state (duplicate email,
    /// already-linked provider identity, last remaining credential).
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflict.
        message: String,
    },

    /// The requested return URL is not on the allow-list.
    #[error("Untrusted return URL: {url}")]
    UntrustedReturnUrl {
        /// The rejected URL.
        url: String,
    },

    /// An OAuth provider was unreachable or returned a malformed response.
    #[error("Upstream provider error: {provider} - {message}")]
    Upstream {
        /// The provider name.
        provider: String,
        /// Description of the error.
        message: String,
    },

    /// An error occurred while storing or retrieving auth data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a new `UntrustedReturnUrl` error.
    #[must_use]
    pub fn untrusted_return_url(url: impl Into<String>) -> Self {
        Self::UntrustedReturnUrl { url: url.into() }
    }

    /// Creates a new `Upstream` error.
    #[must_use]
    pub fn upstream(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is an authentication error (identity could
    /// not be established).
    #[must_use]
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::InvalidToken { .. }
                | Self::TokenExpired
                | Self::InvalidSignature
                | Self::InvalidGrant { .. }
                | Self::ReuseDetected
                | Self::StateMismatch
        )
    }

    /// Returns `true` if this is an authorization error (identity is valid
    /// but lacks permission).
    #[must_use]
    pub fn is_authorization_error(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }

    /// Returns `true` if this error indicates a possible attack and should
    /// be logged distinctly (and may trigger full-session revocation).
    #[must_use]
    pub fn is_security_anomaly(&self) -> bool {
        matches!(self, Self::ReuseDetected | Self::StateMismatch)
    }

    /// Returns `true` if this is a server-side error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. }
                | Self::Storage { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::InvalidCredentials
            | Self::InvalidToken { .. }
            | Self::TokenExpired
            | Self::InvalidSignature
            | Self::InvalidGrant { .. } => ErrorCategory::Authentication,
            Self::ReuseDetected | Self::StateMismatch => ErrorCategory::SecurityAnomaly,
            Self::Forbidden { .. } => ErrorCategory::Authorization,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::UntrustedReturnUrl { .. } => ErrorCategory::Validation,
            Self::Upstream { .. } => ErrorCategory::Upstream,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code this error maps to at the boundary.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 422,
            Self::InvalidCredentials
            | Self::InvalidToken { .. }
            | Self::TokenExpired
            | Self::InvalidSignature
            | Self::InvalidGrant { .. }
            | Self::ReuseDetected
            | Self::StateMismatch => 401,
            Self::Forbidden { .. } => 403,
            Self::Conflict { .. } => 409,
            Self::UntrustedReturnUrl { .. } => 400,
            Self::Upstream { .. } => 502,
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. } => 500,
        }
    }

    /// Returns a stable machine-readable error code for response bodies.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidToken { .. } => "invalid_token",
            Self::TokenExpired => "token_expired",
            Self::InvalidSignature => "invalid_signature",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::ReuseDetected => "reuse_detected",
            Self::StateMismatch => "state_mismatch",
            Self::Forbidden { .. } => "forbidden",
            Self::Conflict { .. } => "conflict",
            Self::UntrustedReturnUrl { .. } => "untrusted_return_url",
            Self::Upstream { .. } => "upstream_error",
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. } => {
                "server_error"
            }
        }
    }
}

/// Categories of authentication/authorization errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Request validation errors.
    Validation,
    /// Authentication-related errors (identity verification).
    Authentication,
    /// Authorization-related errors (permission checks).
    Authorization,
    /// Duplicate/conflicting state errors.
    Conflict,
    /// Possible-attack signals (token reuse, state mismatch).
    SecurityAnomaly,
    /// OAuth provider errors.
    Upstream,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Conflict => write!(f, "conflict"),
            Self::SecurityAnomaly => write!(f, "security_anomaly"),
            Self::Upstream => write!(f, "upstream"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
