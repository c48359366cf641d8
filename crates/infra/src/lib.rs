//! Infrastructure layer: persistence, ledger service, settings.

pub mod seed;
pub mod service;
pub mod settings;
pub mod store;

pub use seed::seed_sample_books;
pub use service::{BookshopService, Clock, LedgerError, LedgerResult, SystemClock};
pub use settings::{DatabaseSettings, SeedSettings, Settings, TelemetrySettings};
pub use store::{InMemoryLedgerStore, LedgerStore, SqliteLedgerStore, StoreError};
