//! Rule Store backends.

mod in_memory;
pub(crate) mod postgres;

pub use in_memory::InMemoryRuleStore;
pub use postgres::PostgresRuleStore;
