//! `rolegate-infra`: storage backends for the rule matrix and user accounts.
//!
//! In-memory backends serve tests and single-process deployments; the
//! Postgres backends share the same traits.

pub mod rule_store;
pub mod seed;
pub mod users;

pub use rule_store::{InMemoryRuleStore, PostgresRuleStore};
pub use seed::{SeededRoles, seed_defaults};
pub use users::{InMemoryUserDirectory, PostgresUserDirectory};
