//! OAuth CSRF state entries.
//!
//! Every outbound provider redirect carries a random `state` value. The
//! value is bound server-side to the provider and the caller's return URL,
//! with a short TTL. The callback must present the same value, and each
//! entry can be consumed exactly once.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::types::Provider;

/// A pending OAuth authorization, keyed by its `state` value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthState {
    /// Random state value embedded in the provider authorization URL.
    pub state: String,

    /// Provider the flow was initiated against. The callback must arrive
    /// on the same provider's endpoint.
    pub provider: Provider,

    /// Return URL the caller asked to be redirected to after login.
    /// Validated against the allow-list before being stored.
    pub return_url: String,

    /// When this entry was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When this entry expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl OAuthState {
    /// Creates a new entry with a fresh random state value.
    #[must_use]
    pub fn new(provider: Provider, return_url: impl Into<String>, ttl: Duration) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            state: Self::generate_state(),
            provider,
            return_url: return_url.into(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Returns `true` if this entry has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Generate a cryptographically secure random state value.
    ///
    /// Returns a 256-bit random value encoded as base64url.
    #[must_use]
    pub fn generate_state() -> String {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}
