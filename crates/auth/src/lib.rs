//! `rolegate-auth`: role-based access control core.
//!
//! Nothing here knows about HTTP or storage: stores are
//! injected through the [`RuleStore`] / [`UserDirectory`] traits and the
//! engine returns a [`Decision`] the boundary maps to a status code.

pub mod actor;
pub mod claims;
pub mod decision;
pub mod elements;
pub mod engine;
pub mod permissions;
pub mod roles;
pub mod store;
pub mod user;
pub mod verb;

pub use actor::Actor;
pub use claims::{Hs256JwtValidator, JwtClaims, JwtValidator, TokenValidationError, validate_claims};
pub use decision::{Decision, DenyReason};
pub use elements::BusinessElement;
pub use engine::{AccessEngine, decide};
pub use permissions::{AccessRoleRule, Grant, PermissionFlags, Scope};
pub use roles::Role;
pub use store::{AdminError, RuleAdmin, RuleStore, StoreError};
pub use user::{ProfileUpdate, User, UserDirectory};
pub use verb::Verb;
