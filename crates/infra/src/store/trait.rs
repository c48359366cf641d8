use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use bookshop_core::BookId;
use bookshop_inventory::Book;
use bookshop_sales::{ReportLine, Sale};

/// Storage operation error.
///
/// These are **infrastructure errors** as opposed to domain errors. `Conflict` and
/// `InsufficientStock` are the storage-level echo of constraints the domain also
/// checks (unique ISBN, restrict-on-delete, guarded stock decrement); they surface
/// here when the persisted state moved between the domain check and the write.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    /// Connectivity, SQL or decode failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Persistence boundary of the ledger: two tables, books and sales.
///
/// ## Guarantees implementations must provide
///
/// - ISBNs are unique across books (`insert_book` / `update_book` fail with `Conflict`).
/// - A book referenced by any sale cannot be deleted (`Conflict`).
/// - `record_sale` decrements the book's stock and appends the sale as one atomic
///   unit, and only if the stock still covers the quantity.
/// - Timestamps are compared in UTC; range queries are half-open `[start, end)`.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_book(&self, book: &Book) -> Result<(), StoreError>;

    /// Overwrite the stored row for `book.id()`; `NotFound` if it does not exist.
    async fn update_book(&self, book: &Book) -> Result<(), StoreError>;

    async fn delete_book(&self, id: BookId) -> Result<(), StoreError>;

    async fn get_book(&self, id: BookId) -> Result<Option<Book>, StoreError>;

    async fn find_book_by_isbn(&self, isbn: &str) -> Result<Option<Book>, StoreError>;

    /// All books, newest first, then by title.
    async fn list_books(&self) -> Result<Vec<Book>, StoreError>;

    async fn count_books(&self) -> Result<u64, StoreError>;

    async fn count_sales_for_book(&self, id: BookId) -> Result<u64, StoreError>;

    /// Atomically take `sale.quantity()` copies out of the book's stock and append
    /// the sale.
    async fn record_sale(&self, sale: &Sale) -> Result<(), StoreError>;

    /// Sales with `start <= sold_at < end`, oldest first, joined with their book.
    async fn sales_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ReportLine>, StoreError>;

    /// Every sale, newest first, joined with its book.
    async fn all_sales(&self) -> Result<Vec<ReportLine>, StoreError>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn insert_book(&self, book: &Book) -> Result<(), StoreError> {
        (**self).insert_book(book).await
    }

    async fn update_book(&self, book: &Book) -> Result<(), StoreError> {
        (**self).update_book(book).await
    }

    async fn delete_book(&self, id: BookId) -> Result<(), StoreError> {
        (**self).delete_book(id).await
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        (**self).get_book(id).await
    }

    async fn find_book_by_isbn(&self, isbn: &str) -> Result<Option<Book>, StoreError> {
        (**self).find_book_by_isbn(isbn).await
    }

    async fn list_books(&self) -> Result<Vec<Book>, StoreError> {
        (**self).list_books().await
    }

    async fn count_books(&self) -> Result<u64, StoreError> {
        (**self).count_books().await
    }

    async fn count_sales_for_book(&self, id: BookId) -> Result<u64, StoreError> {
        (**self).count_sales_for_book(id).await
    }

    async fn record_sale(&self, sale: &Sale) -> Result<(), StoreError> {
        (**self).record_sale(sale).await
    }

    async fn sales_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ReportLine>, StoreError> {
        (**self).sales_between(start, end).await
    }

    async fn all_sales(&self) -> Result<Vec<ReportLine>, StoreError> {
        (**self).all_sales().await
    }
}
