//! SQLite-backed ledger store.
//!
//! ## Schema
//!
//! ```text
//! books(id PK, title, author, isbn UNIQUE, price_cents > 0, stock >= 0, created_at)
//! sales(id PK, book_id -> books(id) ON DELETE RESTRICT, book_description,
//!       unit_price_cents > 0, quantity > 0, sold_at, customer_name NULL)
//! ```
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC text with microsecond precision
//! (`2025-08-11T09:30:00.000000Z`), so lexical comparison in SQL equals time order.
//! Money is stored in integer cents.
//!
//! ## Error Mapping
//!
//! | SQLx error | StoreError |
//! |---|---|
//! | unique violation (`books.isbn`, primary keys) | `Conflict` |
//! | foreign key violation (delete of a referenced book) | `Conflict` |
//! | anything else (IO, pool closed, decode) | `Backend` |

use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::instrument;
use uuid::Uuid;

use bookshop_core::{BookId, Money, SaleId};
use bookshop_inventory::{Book, BookDetails};
use bookshop_sales::{ReportLine, Sale};

use super::r#trait::{LedgerStore, StoreError};

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS books (
        id           TEXT PRIMARY KEY,
        title        TEXT NOT NULL,
        author       TEXT NOT NULL,
        isbn         TEXT NOT NULL UNIQUE,
        price_cents  INTEGER NOT NULL CHECK (price_cents > 0),
        stock        INTEGER NOT NULL CHECK (stock >= 0),
        created_at   TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sales (
        id                TEXT PRIMARY KEY,
        book_id           TEXT NOT NULL REFERENCES books(id) ON DELETE RESTRICT,
        book_description  TEXT NOT NULL,
        unit_price_cents  INTEGER NOT NULL CHECK (unit_price_cents > 0),
        quantity          INTEGER NOT NULL CHECK (quantity > 0),
        sold_at           TEXT NOT NULL,
        customer_name     TEXT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS sales_sold_at ON sales (sold_at)
    "#,
];

const BOOK_COLUMNS: &str = "id, title, author, isbn, price_cents, stock, created_at";

const REPORT_SELECT: &str = r#"
    SELECT s.id, s.book_id, s.book_description, s.unit_price_cents, s.quantity,
           s.sold_at, s.customer_name,
           b.title, b.author, b.isbn
    FROM sales s
    JOIN books b ON b.id = s.book_id
"#;

/// SQLite-backed ledger store.
///
/// Cheap to clone; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

impl SqliteLedgerStore {
    /// Open (creating if missing) the database file at `path` and ensure the schema.
    pub async fn open(path: &Path, max_connections: u32) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create database directory at {parent:?}"))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open SQLite database at {path:?}"))?;

        Self::from_pool(pool).await
    }

    /// A private in-memory database, for tests and throwaway sessions.
    ///
    /// Every pooled connection to `:memory:` is a separate database, so the pool is
    /// pinned to one connection that is never recycled.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("invalid in-memory SQLite URL")?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("failed to open in-memory SQLite database")?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .context("failed to apply ledger schema")?;
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn encode_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(column: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend(format!("invalid {column} timestamp '{raw}': {e}")))
}

fn decode_uuid(column: &str, raw: &str) -> Result<Uuid, StoreError> {
    Uuid::from_str(raw).map_err(|e| StoreError::Backend(format!("invalid {column} '{raw}': {e}")))
}

fn get<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column)
        .map_err(|e| map_sqlx_error("decode_row", e))
}

fn book_from_row(row: &SqliteRow) -> Result<Book, StoreError> {
    let id: String = get(row, "id")?;
    let created_at: String = get(row, "created_at")?;
    let details = BookDetails {
        title: get(row, "title")?,
        author: get(row, "author")?,
        isbn: get(row, "isbn")?,
        price: Money::from_cents(get(row, "price_cents")?),
        stock: get(row, "stock")?,
    };

    Book::restore(
        BookId::from_uuid(decode_uuid("books.id", &id)?),
        &details,
        decode_ts("books.created_at", &created_at)?,
    )
    .map_err(|e| StoreError::Backend(format!("corrupt book row {id}: {e}")))
}

fn report_line_from_row(row: &SqliteRow) -> Result<ReportLine, StoreError> {
    let id: String = get(row, "id")?;
    let book_id: String = get(row, "book_id")?;
    let sold_at: String = get(row, "sold_at")?;

    let sale = Sale::restore(
        SaleId::from_uuid(decode_uuid("sales.id", &id)?),
        BookId::from_uuid(decode_uuid("sales.book_id", &book_id)?),
        get(row, "book_description")?,
        Money::from_cents(get(row, "unit_price_cents")?),
        get(row, "quantity")?,
        decode_ts("sales.sold_at", &sold_at)?,
        get(row, "customer_name")?,
    );

    Ok(ReportLine {
        sale,
        title: get(row, "title")?,
        author: get(row, "author")?,
        isbn: get(row, "isbn")?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
                StoreError::Conflict(msg)
            } else {
                StoreError::Backend(msg)
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("row not found in {operation}")),
        other => StoreError::Backend(format!("{operation}: {other}")),
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    #[instrument(skip_all, fields(book_id = %book.id_typed()), err)]
    async fn insert_book(&self, book: &Book) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO books (id, title, author, isbn, price_cents, stock, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(book.id_typed().to_string())
        .bind(book.title())
        .bind(book.author())
        .bind(book.isbn())
        .bind(book.price().cents())
        .bind(book.stock())
        .bind(encode_ts(book.created_at()))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_book", e))?;

        Ok(())
    }

    #[instrument(skip_all, fields(book_id = %book.id_typed()), err)]
    async fn update_book(&self, book: &Book) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = ?2, author = ?3, isbn = ?4, price_cents = ?5, stock = ?6
            WHERE id = ?1
            "#,
        )
        .bind(book.id_typed().to_string())
        .bind(book.title())
        .bind(book.author())
        .bind(book.isbn())
        .bind(book.price().cents())
        .bind(book.stock())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_book", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("book {}", book.id_typed())));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete_book(&self, id: BookId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_book", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("book {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn get_book(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        let row = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_book", e))?;

        row.as_ref().map(book_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_book_by_isbn(&self, isbn: &str) -> Result<Option<Book>, StoreError> {
        let row = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE isbn = ?1"))
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_book_by_isbn", e))?;

        row.as_ref().map(book_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_books(&self) -> Result<Vec<Book>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books ORDER BY created_at DESC, title ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_books", e))?;

        rows.iter().map(book_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn count_books(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM books")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_books", e))?;

        let n: i64 = get(&row, "n")?;
        Ok(n as u64)
    }

    #[instrument(skip(self), err)]
    async fn count_sales_for_book(&self, id: BookId) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM sales WHERE book_id = ?1")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_sales_for_book", e))?;

        let n: i64 = get(&row, "n")?;
        Ok(n as u64)
    }

    #[instrument(
        skip_all,
        fields(sale_id = %sale.id_typed(), book_id = %sale.book_id(), quantity = sale.quantity()),
        err
    )]
    async fn record_sale(&self, sale: &Sale) -> Result<(), StoreError> {
        let book_id = sale.book_id().to_string();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Guarded decrement: matches no row if the stock no longer covers the sale.
        let updated = sqlx::query("UPDATE books SET stock = stock - ?1 WHERE id = ?2 AND stock >= ?1")
            .bind(sale.quantity())
            .bind(&book_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("decrement_stock", e))?;

        if updated.rows_affected() == 0 {
            let row = sqlx::query("SELECT stock FROM books WHERE id = ?1")
                .bind(&book_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("read_stock", e))?;

            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;

            return Err(match row {
                None => StoreError::NotFound(format!("book {book_id}")),
                Some(row) => StoreError::InsufficientStock {
                    requested: sale.quantity(),
                    available: get(&row, "stock")?,
                },
            });
        }

        sqlx::query(
            r#"
            INSERT INTO sales (
                id,
                book_id,
                book_description,
                unit_price_cents,
                quantity,
                sold_at,
                customer_name
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(sale.id_typed().to_string())
        .bind(&book_id)
        .bind(sale.book_description())
        .bind(sale.unit_price().cents())
        .bind(sale.quantity())
        .bind(encode_ts(sale.sold_at()))
        .bind(sale.customer_name())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_sale", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn sales_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ReportLine>, StoreError> {
        let rows = sqlx::query(&format!(
            "{REPORT_SELECT} WHERE s.sold_at >= ?1 AND s.sold_at < ?2 ORDER BY s.sold_at ASC, s.id ASC"
        ))
        .bind(encode_ts(start))
        .bind(encode_ts(end))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("sales_between", e))?;

        rows.iter().map(report_line_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn all_sales(&self) -> Result<Vec<ReportLine>, StoreError> {
        let rows = sqlx::query(&format!(
            "{REPORT_SELECT} ORDER BY s.sold_at DESC, s.id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("all_sales", e))?;

        rows.iter().map(report_line_from_row).collect()
    }
}
