//! `rolegate-core`: identifiers and the domain error model shared by every crate.
//!
//! Nothing here performs IO.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{ElementId, RoleId, RuleId, UserId};
