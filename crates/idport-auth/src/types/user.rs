//! User domain type.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A registered identity.
///
/// A user always has at least one credential: either `password_hash` is set
/// (local password account) or at least one linked OAuth account exists.
/// Accounts are soft-deleted (`deleted_at`) rather than removed, so active
/// refresh chains can still be revoked against them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,

    /// Email address, normalized to lowercase. Unique across users.
    pub email: String,

    /// Whether the email address has been verified.
    pub email_verified: bool,

    /// Argon2 PHC hash of the password. None for OAuth-only accounts.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    /// First name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    /// Last name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    /// Assigned role name (resolved against the role graph at authorization
    /// time).
    pub role: String,

    /// When the account was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the account was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,

    /// When the account was soft-deleted (None = active).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub deleted_at: Option<OffsetDateTime>,
}

impl User {
    /// Creates a builder for a new user with the given email.
    ///
    /// The email is normalized to lowercase.
    #[must_use]
    pub fn builder(email: impl Into<String>) -> UserBuilder {
        UserBuilder::new(email)
    }

    /// Returns `true` if the account is active (not soft-deleted).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Returns `true` if the account has a local password credential.
    #[must_use]
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Normalizes an email address for storage and lookup.
    ///
    /// Lookup is case-insensitive, so both sides of every comparison go
    /// through this.
    #[must_use]
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }
}

/// Builder for [`User`].
#[derive(Debug, Clone)]
pub struct UserBuilder {
    email: String,
    email_verified: bool,
    password_hash: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    role: String,
}

impl UserBuilder {
    /// Creates a new builder. The email is normalized to lowercase.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: User::normalize_email(&email.into()),
            email_verified: false,
            password_hash: None,
            first_name: None,
            last_name: None,
            role: "user".to_string(),
        }
    }

    /// Marks the email as verified.
    #[must_use]
    pub fn with_email_verified(mut self, verified: bool) -> Self {
        self.email_verified = verified;
        self
    }

    /// Sets the stored password hash (PHC format).
    #[must_use]
    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    /// Sets the first name.
    #[must_use]
    pub fn with_first_name(mut self, name: impl Into<String>) -> Self {
        self.first_name = Some(name.into());
        self
    }

    /// Sets the last name.
    #[must_use]
    pub fn with_last_name(mut self, name: impl Into<String>) -> Self {
        self.last_name = Some(name.into());
        self
    }

    /// Sets the role name.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    /// Builds the user with a fresh id and current timestamps.
    #[must_use]
    pub fn build(self) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            email: self.email,
            email_verified: self.email_verified,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}
