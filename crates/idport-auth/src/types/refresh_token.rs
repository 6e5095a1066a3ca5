//! Refresh token domain type.
//!
//! # Security
//!
//! - Refresh tokens are stored as SHA-256 hashes, never plaintext
//! - Every rotation links the new token to its predecessor, forming a
//!   chain; a second use of a rotated token revokes the whole chain
//! - Expired tokens are rejected lazily at use time

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Refresh token record persisted by the token authority.
///
/// # Storage Security
///
/// The token itself is never stored. Only a SHA-256 hash is persisted,
/// similar to password storage. When validating a refresh token:
///
/// 1. Hash the incoming token
/// 2. Look up by hash
/// 3. Validate expiration and revocation status
///
/// # Rotation chains
///
/// All tokens descending from one login share a `chain_id`. Each rotation
/// revokes the old record and creates a new one carrying
/// `rotated_from = old.id`. At most one record per chain is active at any
/// time; presenting a revoked member of a chain is treated as theft
/// evidence and revokes every member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// Unique identifier for this refresh token record.
    pub id: Uuid,

    /// SHA-256 hash of the actual token value.
    /// The plaintext token is returned to the client but never stored.
    pub token_hash: String,

    /// User this token belongs to.
    pub user_id: Uuid,

    /// Rotation chain this token belongs to. Assigned at login and carried
    /// through every rotation.
    pub chain_id: Uuid,

    /// The record this token replaced (None for the first token of a chain).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotated_from: Option<Uuid>,

    /// Optional device or client fingerprint recorded at issuance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_fingerprint: Option<String>,

    /// When this token was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When this token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When this token was revoked (None = not revoked).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,
}

impl RefreshToken {
    /// Returns `true` if this token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` if this token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if this token is active (not expired and not revoked).
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_expired() && !self.is_revoked()
    }

    /// Hash a token value using SHA-256.
    ///
    /// This is used both when storing new tokens and when looking up
    /// tokens for validation.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Generate a cryptographically secure random token.
    ///
    /// Returns a 256-bit random value encoded as base64url (43 characters).
    #[must_use]
    pub fn generate_token() -> String {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}
