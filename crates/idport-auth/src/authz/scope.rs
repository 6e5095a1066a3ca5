//! Permission scopes.
//!
//! A scope is a `resource:action` pair, e.g. `users:read`. Actions form a
//! hierarchy: `admin` implies `write` implies `read` for the same resource.
//! The implication is evaluated at check time, never expanded in storage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AuthError;

/// Action component of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Write,
    Admin,
}

impl Action {
    /// Returns `true` if holding `self` satisfies a requirement of `required`.
    ///
    /// `admin` covers `write` and `read`; `write` covers `read`.
    #[must_use]
    pub fn implies(&self, required: Action) -> bool {
        self.rank() >= required.rank()
    }

    fn rank(&self) -> u8 {
        match self {
            Action::Read => 0,
            Action::Write => 1,
            Action::Admin => 2,
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Admin => "admin",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Action::Read),
            "write" => Ok(Action::Write),
            "admin" => Ok(Action::Admin),
            other => Err(AuthError::validation(format!(
                "Unknown scope action: '{}'",
                other
            ))),
        }
    }
}

/// A `resource:action` permission unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    /// Resource name, e.g. `users`.
    pub resource: String,

    /// Action on the resource.
    pub action: Action,
}

impl Scope {
    /// Creates a scope.
    #[must_use]
    pub fn new(resource: impl Into<String>, action: Action) -> Self {
        Self {
            resource: resource.into(),
            action,
        }
    }

    /// Parses a `resource:action` string.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the string is not exactly two
    /// non-empty segments joined by `:`, or the action is unknown.
    pub fn parse(s: &str) -> Result<Self, AuthError> {
        let (resource, action) = s
            .split_once(':')
            .ok_or_else(|| AuthError::validation(format!("Malformed scope: '{}'", s)))?;

        // The left segment of split_once cannot contain ':'; anything after
        // a second colon lands in the action and fails the action parse.
        if resource.is_empty() {
            return Err(AuthError::validation(format!("Malformed scope: '{}'", s)));
        }

        Ok(Self {
            resource: resource.to_string(),
            action: action.parse()?,
        })
    }

    /// Returns `true` if holding this scope satisfies `required`.
    ///
    /// The resource must match exactly; the action is compared through the
    /// hierarchy.
    #[must_use]
    pub fn covers(&self, required: &Scope) -> bool {
        self.resource == required.resource && self.action.implies(required.action)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

impl FromStr for Scope {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Scope {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Scope::parse(&s).map_err(serde::de::Error::custom)
    }
}
