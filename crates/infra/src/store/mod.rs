//! Book and sale persistence.

pub mod in_memory;
pub mod sqlite;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{LedgerStore, StoreError};
pub use sqlite::SqliteLedgerStore;
