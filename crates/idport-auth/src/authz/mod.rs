//! Role-based authorization.

pub mod engine;
pub mod roles;
pub mod scope;

pub use engine::{AccessDecision, AuthorizationEngine, DenialReason};
pub use roles::{RoleDefinition, RoleGraph};
pub use scope::{Action, Scope};
