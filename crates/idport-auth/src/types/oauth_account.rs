//! OAuth account link domain type.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AuthError;

/// Supported external identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Github,
    Microsoft,
}

impl Provider {
    /// Canonical lowercase name, as used in URLs and storage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Github => "github",
            Provider::Microsoft => "microsoft",
        }
    }

    /// All supported providers.
    #[must_use]
    pub fn all() -> &'static [Provider] {
        &[Provider::Google, Provider::Github, Provider::Microsoft]
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "github" => Ok(Provider::Github),
            "microsoft" => Ok(Provider::Microsoft),
            other => Err(AuthError::validation(format!(
                "Unknown provider: '{}'",
                other
            ))),
        }
    }
}

/// A link between a local user and an external provider identity.
///
/// `(provider, provider_user_id)` is globally unique: one external identity
/// maps to exactly one local user. A user may hold links to several
/// providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthAccount {
    /// Unique identifier for this link record.
    pub id: Uuid,

    /// Local user this identity is linked to.
    pub user_id: Uuid,

    /// External provider.
    pub provider: Provider,

    /// Stable subject identifier issued by the provider.
    pub provider_user_id: String,

    /// Email address reported by the provider at link time.
    pub email: String,

    /// When the link was established.
    #[serde(with = "time::serde::rfc3339")]
    pub linked_at: OffsetDateTime,
}

impl OAuthAccount {
    /// Creates a new link record with a fresh id and current timestamp.
    #[must_use]
    pub fn new(
        user_id: Uuid,
        provider: Provider,
        provider_user_id: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            provider,
            provider_user_id: provider_user_id.into(),
            email: email.into(),
            linked_at: OffsetDateTime::now_utc(),
        }
    }
}
