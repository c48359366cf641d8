use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bookshop_core::{BookId, DomainError};
use bookshop_inventory::{Book, catalogue_order};
use bookshop_sales::{ReportLine, Sale};

use super::r#trait::{LedgerStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    books: HashMap<BookId, Book>,
    sales: Vec<Sale>,
}

impl Tables {
    fn isbn_taken(&self, isbn: &str, except: Option<BookId>) -> bool {
        self.books
            .values()
            .any(|b| b.isbn() == isbn && Some(b.id_typed()) != except)
    }

    fn join(&self, sale: &Sale) -> Option<ReportLine> {
        let book = self.books.get(&sale.book_id())?;
        Some(ReportLine {
            sale: sale.clone(),
            title: book.title().to_string(),
            author: book.author().to_string(),
            isbn: book.isbn().to_string(),
        })
    }
}

/// In-memory ledger store.
///
/// Intended for tests/dev. A single lock over both tables makes every operation,
/// `record_sale` included, atomic. [`set_unavailable`](Self::set_unavailable) makes
/// every call fail with `StoreError::Backend`, to exercise storage-fault paths.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("store unavailable".to_string()));
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> Result<T, StoreError>) -> Result<T, StoreError> {
        self.check_available()?;
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        f(&tables)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T, StoreError>) -> Result<T, StoreError> {
        self.check_available()?;
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        f(&mut tables)
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert_book(&self, book: &Book) -> Result<(), StoreError> {
        self.write(|t| {
            if t.books.contains_key(&book.id_typed()) {
                return Err(StoreError::Conflict(format!("book {} already exists", book.id_typed())));
            }
            if t.isbn_taken(book.isbn(), None) {
                return Err(StoreError::Conflict(format!("isbn {} already exists", book.isbn())));
            }
            t.books.insert(book.id_typed(), book.clone());
            Ok(())
        })
    }

    async fn update_book(&self, book: &Book) -> Result<(), StoreError> {
        self.write(|t| {
            if !t.books.contains_key(&book.id_typed()) {
                return Err(StoreError::NotFound(format!("book {}", book.id_typed())));
            }
            if t.isbn_taken(book.isbn(), Some(book.id_typed())) {
                return Err(StoreError::Conflict(format!("isbn {} already exists", book.isbn())));
            }
            t.books.insert(book.id_typed(), book.clone());
            Ok(())
        })
    }

    async fn delete_book(&self, id: BookId) -> Result<(), StoreError> {
        self.write(|t| {
            if t.sales.iter().any(|s| s.book_id() == id) {
                return Err(StoreError::Conflict(format!("book {id} is referenced by sales")));
            }
            t.books
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| StoreError::NotFound(format!("book {id}")))
        })
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        self.read(|t| Ok(t.books.get(&id).cloned()))
    }

    async fn find_book_by_isbn(&self, isbn: &str) -> Result<Option<Book>, StoreError> {
        self.read(|t| Ok(t.books.values().find(|b| b.isbn() == isbn).cloned()))
    }

    async fn list_books(&self) -> Result<Vec<Book>, StoreError> {
        self.read(|t| {
            let mut books: Vec<Book> = t.books.values().cloned().collect();
            books.sort_by(catalogue_order);
            Ok(books)
        })
    }

    async fn count_books(&self) -> Result<u64, StoreError> {
        self.read(|t| Ok(t.books.len() as u64))
    }

    async fn count_sales_for_book(&self, id: BookId) -> Result<u64, StoreError> {
        self.read(|t| Ok(t.sales.iter().filter(|s| s.book_id() == id).count() as u64))
    }

    async fn record_sale(&self, sale: &Sale) -> Result<(), StoreError> {
        self.write(|t| {
            let book = t
                .books
                .get_mut(&sale.book_id())
                .ok_or_else(|| StoreError::NotFound(format!("book {}", sale.book_id())))?;

            book.remove_stock(sale.quantity()).map_err(|e| match e {
                DomainError::InsufficientStock {
                    requested,
                    available,
                } => StoreError::InsufficientStock {
                    requested,
                    available,
                },
                other => StoreError::Conflict(other.to_string()),
            })?;

            t.sales.push(sale.clone());
            Ok(())
        })
    }

    async fn sales_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ReportLine>, StoreError> {
        self.read(|t| {
            let mut lines: Vec<ReportLine> = t
                .sales
                .iter()
                .filter(|s| start <= s.sold_at() && s.sold_at() < end)
                .filter_map(|s| t.join(s))
                .collect();
            lines.sort_by_key(|l| (l.sale.sold_at(), l.sale.id_typed()));
            Ok(lines)
        })
    }

    async fn all_sales(&self) -> Result<Vec<ReportLine>, StoreError> {
        self.read(|t| {
            let mut lines: Vec<ReportLine> = t.sales.iter().filter_map(|s| t.join(s)).collect();
            lines.sort_by(|a, b| {
                b.sale
                    .sold_at()
                    .cmp(&a.sale.sold_at())
                    .then_with(|| b.sale.id_typed().cmp(&a.sale.id_typed()))
            });
            Ok(lines)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshop_core::{Money, SaleId};
    use bookshop_inventory::BookDetails;
    use chrono::TimeZone;

    fn book(isbn: &str, stock: i64) -> Book {
        Book::create(
            BookId::new(),
            &BookDetails {
                title: "Moby-Dick".to_string(),
                author: "Herman Melville".to_string(),
                isbn: isbn.to_string(),
                price: Money::from_cents(1099),
                stock,
            },
            Utc.with_ymd_and_hms(2025, 8, 7, 15, 37, 41).unwrap(),
        )
        .unwrap()
    }

    fn sale_of(book: &Book, quantity: i64) -> Sale {
        Sale::record(
            SaleId::new(),
            book,
            book.price(),
            quantity,
            None,
            Utc.with_ymd_and_hms(2025, 8, 11, 10, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_isbn_is_a_conflict() {
        let store = InMemoryLedgerStore::new();
        store.insert_book(&book("978-1503280786", 1)).await.unwrap();
        let err = store.insert_book(&book("978-1503280786", 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.count_books().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn oversell_leaves_tables_untouched() {
        let store = InMemoryLedgerStore::new();
        let b = book("978-1503280786", 2);
        store.insert_book(&b).await.unwrap();

        let err = store.record_sale(&sale_of(&b, 3)).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock {
                requested: 3,
                available: 2
            }
        ));
        assert_eq!(store.get_book(b.id_typed()).await.unwrap().unwrap().stock(), 2);
        assert!(store.all_sales().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn referenced_book_cannot_be_deleted() {
        let store = InMemoryLedgerStore::new();
        let b = book("978-1503280786", 2);
        store.insert_book(&b).await.unwrap();
        store.record_sale(&sale_of(&b, 1)).await.unwrap();

        let err = store.delete_book(b.id_typed()).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.count_sales_for_book(b.id_typed()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryLedgerStore::new();
        store.set_unavailable(true);
        assert!(matches!(store.list_books().await, Err(StoreError::Backend(_))));
        store.set_unavailable(false);
        assert!(store.list_books().await.unwrap().is_empty());
    }
}
