//! Authorization engine.
//!
//! A pure policy check: resolve the role in the presented claims to its
//! effective permission set and test coverage of the required scope.
//! Unknown roles and malformed scopes deny, never error, so the engine can
//! only fail closed.

use std::sync::Arc;

use crate::authz::roles::RoleGraph;
use crate::authz::scope::Scope;
use crate::token::jwt::AccessTokenClaims;

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Access granted.
    Granted,
    /// Access denied, with the reason recorded for logging.
    Denied {
        /// Why access was denied.
        reason: DenialReason,
    },
}

impl AccessDecision {
    /// Returns `true` if access was granted.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted)
    }

    fn denied(reason: DenialReason) -> Self {
        AccessDecision::Denied { reason }
    }
}

/// Why an authorization check denied access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// The role in the claims is not defined in the role graph.
    UnknownRole,
    /// The role's effective permissions do not cover the required scope.
    InsufficientScope,
}

/// Authorization engine backed by an immutable role graph.
///
/// Cheap to clone; the graph is shared.
#[derive(Debug, Clone)]
pub struct AuthorizationEngine {
    role_graph: Arc<RoleGraph>,
}

impl AuthorizationEngine {
    /// Creates an engine over a role graph.
    #[must_use]
    pub fn new(role_graph: Arc<RoleGraph>) -> Self {
        Self { role_graph }
    }

    /// Creates an engine over the builtin `user`/`moderator`/`admin` graph.
    #[must_use]
    pub fn with_builtin_roles() -> Self {
        Self::new(Arc::new(RoleGraph::builtin()))
    }

    /// Checks whether the presented claims cover the required scope.
    ///
    /// Pure and deterministic, no I/O. Resolves the role's effective
    /// permission set (own grants plus ancestors) and tests coverage,
    /// applying the action hierarchy.
    #[must_use]
    pub fn authorize(&self, claims: &AccessTokenClaims, required: &Scope) -> AccessDecision {
        let Some(permissions) = self.role_graph.effective_permissions(&claims.role) else {
            tracing::debug!(role = %claims.role, "Authorization denied: unknown role");
            return AccessDecision::denied(DenialReason::UnknownRole);
        };

        if permissions.iter().any(|held| held.covers(required)) {
            AccessDecision::Granted
        } else {
            tracing::debug!(
                role = %claims.role,
                required = %required,
                "Authorization denied: insufficient scope"
            );
            AccessDecision::denied(DenialReason::InsufficientScope)
        }
    }

    /// Parses and checks a required scope given as a string.
    ///
    /// A malformed scope string denies rather than erroring.
    #[must_use]
    pub fn authorize_str(&self, claims: &AccessTokenClaims, required: &str) -> AccessDecision {
        match Scope::parse(required) {
            Ok(scope) => self.authorize(claims, &scope),
            Err(_) => {
                tracing::debug!(required, "Authorization denied: malformed scope");
                AccessDecision::denied(DenialReason::InsufficientScope)
            }
        }
    }

    /// Returns the underlying role graph.
    #[must_use]
    pub fn role_graph(&self) -> &RoleGraph {
        &self.role_graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_with_role(role: &str) -> AccessTokenClaims {
        AccessTokenClaims::new("https://auth.example.com", "user123", role, 900)
    }

    #[test]
    fn test_admin_granted_full_hierarchy() {
        let engine = AuthorizationEngine::with_builtin_roles();
        let claims = claims_with_role("admin");

        assert!(engine.authorize_str(&claims, "users:read").is_granted());
        assert!(engine.authorize_str(&claims, "users:write").is_granted());
        assert!(engine.authorize_str(&claims, "users:admin").is_granted());
    }

    #[test]
    fn test_user_denied_write() {
        let engine = AuthorizationEngine::with_builtin_roles();
        let claims = claims_with_role("user");

        assert!(engine.authorize_str(&claims, "users:read").is_granted());
        assert_eq!(
            engine.authorize_str(&claims, "users:write"),
            AccessDecision::Denied {
                reason: DenialReason::InsufficientScope
            }
        );
    }

    #[test]
    fn test_moderator_inherits_user() {
        let engine = AuthorizationEngine::with_builtin_roles();
        let claims = claims_with_role("moderator");

        assert!(engine.authorize_str(&claims, "users:read").is_granted());
        assert!(engine.authorize_str(&claims, "users:write").is_granted());
        assert!(!engine.authorize_str(&claims, "users:admin").is_granted());
    }

    #[test]
    fn test_unknown_role_denied() {
        let engine = AuthorizationEngine::with_builtin_roles();
        let claims = claims_with_role("superuser");

        assert_eq!(
            engine.authorize_str(&claims, "users:read"),
            AccessDecision::Denied {
                reason: DenialReason::UnknownRole
            }
        );
    }

    #[test]
    fn test_malformed_scope_denied() {
        let engine = AuthorizationEngine::with_builtin_roles();
        let claims = claims_with_role("admin");

        // Even admin is denied when the requirement itself is malformed
        assert!(!engine.authorize_str(&claims, "users").is_granted());
        assert!(!engine.authorize_str(&claims, "users:delete").is_granted());
        assert!(!engine.authorize_str(&claims, "").is_granted());
    }

    #[test]
    fn test_unrelated_resource_denied() {
        let engine = AuthorizationEngine::with_builtin_roles();
        let claims = claims_with_role("admin");
        assert!(!engine.authorize_str(&claims, "billing:read").is_granted());
    }
}
