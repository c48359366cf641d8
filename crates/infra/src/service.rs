//! Ledger application service.
//!
//! `BookshopService` is the single entry point for every inventory and sales
//! operation. It composes the pure domain rules (`bookshop-inventory`,
//! `bookshop-sales`) with an injected [`LedgerStore`] and [`Clock`]:
//!
//! ```text
//! request
//!   ↓
//! 1. Load current state from the store
//!   ↓
//! 2. Apply domain rules (validation, stock, ISBN ownership)
//!   ↓
//! 3. Persist (the sale path is one store transaction)
//!   ↓
//! 4. Log the outcome
//! ```
//!
//! Successful mutations are logged at `info`, rejected requests at `warn` and storage
//! faults at `error`.

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use bookshop_core::{BookId, DomainError, Money, SaleId};
use bookshop_inventory::{Book, BookDetails};
use bookshop_sales::{DayWindow, ReportLine, Sale, SaleRequest, SalesSummary, sell, summarize};

use crate::store::{LedgerStore, StoreError};

/// Source of "now" for `created_at` and `sold_at`.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<F> Clock for F
where
    F: Fn() -> DateTime<Utc> + Send + Sync,
{
    fn now(&self) -> DateTime<Utc> {
        self()
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Error returned by every ledger operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    /// The store could not be reached or returned garbage.
    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// `true` for infrastructure faults, `false` for business-rule rejections.
    pub fn is_storage(&self) -> bool {
        matches!(self, LedgerError::Storage(_))
    }
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => LedgerError::Validation(msg),
            DomainError::InvalidId(msg) => LedgerError::Validation(msg),
            DomainError::NotFound(msg) => LedgerError::NotFound(msg),
            DomainError::Conflict(msg) => LedgerError::Conflict(msg),
            DomainError::InsufficientStock {
                requested,
                available,
            } => LedgerError::InsufficientStock {
                requested,
                available,
            },
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => LedgerError::Conflict(msg),
            StoreError::NotFound(msg) => LedgerError::NotFound(msg),
            StoreError::InsufficientStock {
                requested,
                available,
            } => LedgerError::InsufficientStock {
                requested,
                available,
            },
            StoreError::Backend(msg) => LedgerError::Storage(msg),
        }
    }
}

fn log_failure(operation: &'static str, err: &LedgerError) {
    if err.is_storage() {
        error!(operation, error = %err, "ledger storage failure");
    } else {
        warn!(operation, error = %err, "ledger request rejected");
    }
}

/// Inventory and sales ledger over a [`LedgerStore`].
#[derive(Debug, Clone)]
pub struct BookshopService<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S> BookshopService<S, SystemClock>
where
    S: LedgerStore,
{
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S, C> BookshopService<S, C>
where
    S: LedgerStore,
    C: Clock,
{
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current time at the precision the stores keep (microseconds).
    fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(6)
    }

    // ---- inventory ------------------------------------------------------

    /// Create a book with a fresh id, stamped with the current time.
    pub async fn add_book(&self, details: &BookDetails) -> LedgerResult<Book> {
        let result = async {
            let book = Book::create(BookId::new(), details, self.now())?;
            if self.store.find_book_by_isbn(book.isbn()).await?.is_some() {
                return Err(LedgerError::Conflict(format!(
                    "a book with ISBN {} already exists",
                    book.isbn()
                )));
            }
            self.store.insert_book(&book).await?;
            Ok::<_, LedgerError>(book)
        }
        .await;

        match &result {
            Ok(book) => info!(book_id = %book.id_typed(), isbn = book.isbn(), "book added"),
            Err(e) => log_failure("add_book", e),
        }
        result
    }

    /// Overwrite every mutable field of `id`; `created_at` is kept.
    pub async fn update_book(&self, id: BookId, details: &BookDetails) -> LedgerResult<Book> {
        let result = async {
            let mut book = self.load_book(id).await?;
            book.update(details)?;
            if let Some(owner) = self.store.find_book_by_isbn(book.isbn()).await? {
                if owner.id_typed() != id {
                    return Err(LedgerError::Conflict(format!(
                        "ISBN {} belongs to another book",
                        book.isbn()
                    )));
                }
            }
            self.store.update_book(&book).await?;
            Ok::<_, LedgerError>(book)
        }
        .await;

        match &result {
            Ok(book) => info!(book_id = %id, stock = book.stock(), "book updated"),
            Err(e) => log_failure("update_book", e),
        }
        result
    }

    /// Remove a book that no sale refers to.
    pub async fn delete_book(&self, id: BookId) -> LedgerResult<()> {
        let result = async {
            self.load_book(id).await?;
            let sales = self.store.count_sales_for_book(id).await?;
            if sales > 0 {
                return Err(LedgerError::Conflict(format!(
                    "book {id} has {sales} recorded sale(s) and cannot be deleted"
                )));
            }
            self.store.delete_book(id).await?;
            Ok::<_, LedgerError>(())
        }
        .await;

        match &result {
            Ok(()) => info!(book_id = %id, "book deleted"),
            Err(e) => log_failure("delete_book", e),
        }
        result
    }

    /// Every book, newest first, then by title.
    pub async fn list_books(&self) -> LedgerResult<Vec<Book>> {
        self.store
            .list_books()
            .await
            .map_err(LedgerError::from)
            .inspect_err(|e| log_failure("list_books", e))
    }

    pub async fn get_book(&self, id: BookId) -> LedgerResult<Book> {
        self.load_book(id)
            .await
            .inspect_err(|e| log_failure("get_book", e))
    }

    /// Books that can be sold right now (stock > 0), in catalogue order.
    pub async fn available_books(&self) -> LedgerResult<Vec<Book>> {
        let mut books = self.list_books().await?;
        books.retain(Book::is_in_stock);
        Ok(books)
    }

    async fn load_book(&self, id: BookId) -> LedgerResult<Book> {
        self.store
            .get_book(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("book {id}")))
    }

    // ---- sales ----------------------------------------------------------

    /// Record a sale: the stock decrement and the new sale commit together.
    pub async fn sell_book(&self, request: &SaleRequest) -> LedgerResult<Sale> {
        let result = async {
            let book = self.load_book(request.book_id).await?;
            let (_, sale) = sell(&book, request, SaleId::new(), self.now())?;
            self.store.record_sale(&sale).await?;
            Ok::<_, LedgerError>(sale)
        }
        .await;

        match &result {
            Ok(sale) => info!(
                sale_id = %sale.id_typed(),
                book_id = %sale.book_id(),
                quantity = sale.quantity(),
                total = %sale.line_total(),
                "sale recorded"
            ),
            Err(e) => log_failure("sell_book", e),
        }
        result
    }

    /// Boolean form of [`sell_book`](Self::sell_book): `Ok(false)` for any rejected
    /// sale, `Err` only when storage failed.
    pub async fn try_sell_book(&self, request: &SaleRequest) -> LedgerResult<bool> {
        match self.sell_book(request).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_storage() => Err(e),
            Err(_) => Ok(false),
        }
    }

    // ---- reporting ------------------------------------------------------

    /// Sales made on the UTC calendar day `date`, oldest first.
    pub async fn sales_by_date(&self, date: NaiveDate) -> LedgerResult<Vec<ReportLine>> {
        let window = DayWindow::for_date(date);
        self.sales_between(window.start, window.end).await
    }

    /// Sales with `start <= sold_at < end`, oldest first.
    pub async fn sales_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LedgerResult<Vec<ReportLine>> {
        if end <= start {
            return Ok(Vec::new());
        }
        self.store
            .sales_between(start, end)
            .await
            .map_err(LedgerError::from)
            .inspect_err(|e| log_failure("sales_between", e))
    }

    /// Every sale, newest first.
    pub async fn all_sales(&self) -> LedgerResult<Vec<ReportLine>> {
        self.store
            .all_sales()
            .await
            .map_err(LedgerError::from)
            .inspect_err(|e| log_failure("all_sales", e))
    }

    pub async fn summary_for_date(&self, date: NaiveDate) -> LedgerResult<SalesSummary> {
        Ok(summarize(&self.sales_by_date(date).await?))
    }

    pub async fn revenue_for_date(&self, date: NaiveDate) -> LedgerResult<Money> {
        Ok(self.summary_for_date(date).await?.revenue)
    }
}
