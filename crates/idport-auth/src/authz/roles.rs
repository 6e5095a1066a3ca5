//! Role definitions and the role inheritance graph.
//!
//! Roles form a directed acyclic graph: each role names the parent roles it
//! inherits from. The graph is built once at startup, validated (no cycles,
//! no dangling parents), and shared read-only across all request handlers.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::authz::scope::Scope;
use crate::error::AuthError;

/// Definition of one role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Role name.
    pub name: String,

    /// Roles this role inherits permissions from.
    #[serde(default)]
    pub inherits: Vec<String>,

    /// Permissions granted directly to this role.
    #[serde(default)]
    pub permissions: Vec<Scope>,
}

impl RoleDefinition {
    /// Creates a role definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inherits: Vec::new(),
            permissions: Vec::new(),
        }
    }

    /// Adds a parent role.
    #[must_use]
    pub fn inherits(mut self, parent: impl Into<String>) -> Self {
        self.inherits.push(parent.into());
        self
    }

    /// Adds a directly granted permission.
    #[must_use]
    pub fn grant(mut self, scope: Scope) -> Self {
        self.permissions.push(scope);
        self
    }
}

/// Immutable role inheritance graph.
///
/// Built once at startup and shared read-only; safe for unsynchronized
/// concurrent reads.
#[derive(Debug, Clone)]
pub struct RoleGraph {
    roles: HashMap<String, RoleDefinition>,
}

impl RoleGraph {
    /// Builds a graph from role definitions.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if:
    /// - Two definitions share a name
    /// - A role inherits from an undefined role
    /// - The inheritance relation contains a cycle
    pub fn new(definitions: Vec<RoleDefinition>) -> Result<Self, AuthError> {
        let mut roles = HashMap::new();
        for def in definitions {
            if roles.insert(def.name.clone(), def).is_some() {
                return Err(AuthError::configuration("Duplicate role definition"));
            }
        }

        for def in roles.values() {
            for parent in &def.inherits {
                if !roles.contains_key(parent) {
                    return Err(AuthError::configuration(format!(
                        "Role '{}' inherits from undefined role '{}'",
                        def.name, parent
                    )));
                }
            }
        }

        let graph = Self { roles };
        graph.check_acyclic()?;
        Ok(graph)
    }

    /// Builds the default graph: `user` ⊂ `moderator` ⊂ `admin`.
    ///
    /// - `user`: read access to own profile data
    /// - `moderator`: everything `user` has, plus write on users and content
    /// - `admin`: everything `moderator` has, plus admin on users and content
    #[must_use]
    pub fn builtin() -> Self {
        use crate::authz::scope::Action;

        let definitions = vec![
            RoleDefinition::new("user")
                .grant(Scope::new("users", Action::Read))
                .grant(Scope::new("content", Action::Read)),
            RoleDefinition::new("moderator")
                .inherits("user")
                .grant(Scope::new("users", Action::Write))
                .grant(Scope::new("content", Action::Write)),
            RoleDefinition::new("admin")
                .inherits("moderator")
                .grant(Scope::new("users", Action::Admin))
                .grant(Scope::new("content", Action::Admin)),
        ];

        // The builtin definitions are acyclic by construction.
        match Self::new(definitions) {
            Ok(graph) => graph,
            Err(_) => unreachable!("builtin role graph is valid"),
        }
    }

    /// Returns `true` if the role is defined.
    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    /// Resolves the full permission set of a role: its own grants plus the
    /// grants of every ancestor.
    ///
    /// Returns `None` for an unknown role.
    #[must_use]
    pub fn effective_permissions(&self, role: &str) -> Option<HashSet<Scope>> {
        if !self.roles.contains_key(role) {
            return None;
        }

        let mut permissions = HashSet::new();
        let mut visited = HashSet::new();
        let mut stack = vec![role.to_string()];

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            if let Some(def) = self.roles.get(&name) {
                permissions.extend(def.permissions.iter().cloned());
                stack.extend(def.inherits.iter().cloned());
            }
        }

        Some(permissions)
    }

    fn check_acyclic(&self) -> Result<(), AuthError> {
        // DFS with an explicit in-progress set per root.
        for root in self.roles.keys() {
            let mut in_progress = HashSet::new();
            self.visit(root, &mut in_progress)?;
        }
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        role: &'a str,
        in_progress: &mut HashSet<&'a str>,
    ) -> Result<(), AuthError> {
        if !in_progress.insert(role) {
            return Err(AuthError::configuration(format!(
                "Role inheritance cycle involving '{}'",
                role
            )));
        }
        if let Some(def) = self.roles.get(role) {
            for parent in &def.inherits {
                self.visit(parent, in_progress)?;
            }
        }
        in_progress.remove(role);
        Ok(())
    }
}
