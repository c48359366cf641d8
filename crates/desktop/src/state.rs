use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::info;

use bookshop_infra::{
    BookshopService, InMemoryLedgerStore, LedgerStore, Settings, SqliteLedgerStore,
    seed_sample_books,
};

use crate::books::BookManagement;
use crate::point_of_sale::PointOfSale;
use crate::report::SalesReport;
use crate::types::Notice;

/// The ledger as seen by the controllers.
pub type Ledger = BookshopService<Arc<dyn LedgerStore>>;

/// Application state shared by every view.
#[derive(Clone)]
pub struct AppState {
    ledger: Arc<Ledger>,
}

impl AppState {
    /// Install logging, open the configured database and seed an empty catalogue.
    pub async fn bootstrap(settings: &Settings) -> anyhow::Result<Self> {
        bookshop_observability::init(settings.telemetry.log_format);

        let path = settings
            .database
            .resolve_path()
            .context("failed to resolve database path")?;
        let store = SqliteLedgerStore::open(&path, settings.database.max_connections).await?;
        info!(path = %path.display(), "ledger database opened");

        let state = Self::from_store(Arc::new(store));
        if settings.seed.sample_books {
            seed_sample_books(&*state.ledger)
                .await
                .context("failed to seed sample books")?;
        }
        Ok(state)
    }

    /// A throwaway ledger held in memory.
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryLedgerStore::new()))
    }

    pub fn from_store(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            ledger: Arc::new(BookshopService::new(store)),
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn book_management(&self) -> BookManagement {
        BookManagement::new(self.ledger.clone())
    }

    pub fn point_of_sale(&self) -> PointOfSale {
        PointOfSale::new(self.ledger.clone())
    }

    /// Report view opened on today's (UTC) date.
    pub fn sales_report(&self) -> SalesReport {
        SalesReport::new(self.ledger.clone(), Utc::now().date_naive())
    }

    /// Fill an empty catalogue with the sample books on request.
    pub async fn initialize_database(&self) -> Notice {
        match seed_sample_books(&*self.ledger).await {
            Ok(0) => Notice::info(
                "Initialize Database",
                "The catalogue already has books; nothing was added.",
            ),
            Ok(added) => Notice::info(
                "Initialize Database",
                format!("Database initialized with {added} sample books."),
            ),
            Err(e) => Notice::from_ledger("Initialize Database", &e),
        }
    }
}
