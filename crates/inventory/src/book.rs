use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookshop_core::{BookId, DomainError, DomainResult, Entity, MAX_QUANTITY, Money};

pub const TITLE_MAX_LEN: usize = 200;
pub const AUTHOR_MAX_LEN: usize = 100;
pub const ISBN_MAX_LEN: usize = 20;

/// The user-editable fields of a book, as submitted by the add / edit forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDetails {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub price: Money,
    pub stock: i64,
}

impl BookDetails {
    /// Validate field constraints and return a copy with text fields trimmed.
    pub fn validated(&self) -> DomainResult<BookDetails> {
        let title = required("title", &self.title, TITLE_MAX_LEN)?;
        let author = required("author", &self.author, AUTHOR_MAX_LEN)?;
        let isbn = required("isbn", &self.isbn, ISBN_MAX_LEN)?;

        if !self.price.is_positive() {
            return Err(DomainError::validation("price must be greater than zero"));
        }
        if self.price > Money::MAX_PRICE {
            return Err(DomainError::validation(format!(
                "price cannot exceed {}",
                Money::MAX_PRICE
            )));
        }
        if self.stock < 0 {
            return Err(DomainError::validation("stock cannot be negative"));
        }
        if self.stock > MAX_QUANTITY {
            return Err(DomainError::validation(format!("stock cannot exceed {MAX_QUANTITY}")));
        }

        Ok(BookDetails {
            title,
            author,
            isbn,
            price: self.price,
            stock: self.stock,
        })
    }
}

fn required(field: &str, value: &str, max_len: usize) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    if value.chars().count() > max_len {
        return Err(DomainError::validation(format!(
            "{field} cannot be longer than {max_len} characters"
        )));
    }
    Ok(value.to_string())
}

/// A catalogue entry.
///
/// Fields are private so that every instance has passed [`BookDetails::validated`]
/// and `stock >= 0` holds for its whole life.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    id: BookId,
    title: String,
    author: String,
    isbn: String,
    price: Money,
    stock: i64,
    created_at: DateTime<Utc>,
}

impl Book {
    /// Create a new book from submitted details.
    pub fn create(id: BookId, details: &BookDetails, created_at: DateTime<Utc>) -> DomainResult<Self> {
        let d = details.validated()?;
        Ok(Self {
            id,
            title: d.title,
            author: d.author,
            isbn: d.isbn,
            price: d.price,
            stock: d.stock,
            created_at,
        })
    }

    /// Rebuild a book from persisted columns.
    ///
    /// Storage adapters use this; the row is re-validated so a corrupted table
    /// surfaces as an error instead of an invalid entity.
    pub fn restore(
        id: BookId,
        details: &BookDetails,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Self::create(id, details, created_at)
    }

    /// Overwrite every mutable field. `id` and `created_at` are kept.
    pub fn update(&mut self, details: &BookDetails) -> DomainResult<()> {
        let d = details.validated()?;
        self.title = d.title;
        self.author = d.author;
        self.isbn = d.isbn;
        self.price = d.price;
        self.stock = d.stock;
        Ok(())
    }

    /// Take `quantity` copies out of stock for a sale.
    pub fn remove_stock(&mut self, quantity: i64) -> DomainResult<()> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be greater than zero"));
        }
        if quantity > self.stock {
            return Err(DomainError::insufficient_stock(quantity, self.stock));
        }
        self.stock -= quantity;
        Ok(())
    }

    pub fn id_typed(&self) -> BookId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    /// `"{title} by {author} ({isbn})"`, the snapshot stored on every sale.
    pub fn description(&self) -> String {
        format!("{} by {} ({})", self.title, self.author, self.isbn)
    }

    pub fn details(&self) -> BookDetails {
        BookDetails {
            title: self.title.clone(),
            author: self.author.clone(),
            isbn: self.isbn.clone(),
            price: self.price,
            stock: self.stock,
        }
    }
}

impl Entity for Book {
    type Id = BookId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Catalogue display order: newest first, then title.
pub fn catalogue_order(a: &Book, b: &Book) -> core::cmp::Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.title.cmp(&b.title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn details(stock: i64) -> BookDetails {
        BookDetails {
            title: "The Hobbit".to_string(),
            author: "J.R.R. Tolkien".to_string(),
            isbn: "978-0547928227".to_string(),
            price: Money::from_cents(1999),
            stock,
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 11, hour, 0, 0).unwrap()
    }

    fn assert_validation(result: DomainResult<Book>, needle: &str) {
        match result {
            Err(DomainError::Validation(msg)) => {
                assert!(msg.contains(needle), "message {msg:?} should mention {needle:?}")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_trims_text_fields() {
        let mut d = details(3);
        d.title = "  The Hobbit  ".to_string();
        let book = Book::create(BookId::new(), &d, at(9)).unwrap();
        assert_eq!(book.title(), "The Hobbit");
        assert_eq!(book.stock(), 3);
    }

    #[test]
    fn create_rejects_blank_fields() {
        let mut d = details(1);
        d.title = "   ".to_string();
        assert_validation(Book::create(BookId::new(), &d, at(9)), "title");

        let mut d = details(1);
        d.author = String::new();
        assert_validation(Book::create(BookId::new(), &d, at(9)), "author");

        let mut d = details(1);
        d.isbn = String::new();
        assert_validation(Book::create(BookId::new(), &d, at(9)), "isbn");
    }

    #[test]
    fn create_rejects_overlong_fields() {
        let mut d = details(1);
        d.isbn = "9".repeat(ISBN_MAX_LEN + 1);
        assert_validation(Book::create(BookId::new(), &d, at(9)), "isbn");

        let mut d = details(1);
        d.title = "x".repeat(TITLE_MAX_LEN);
        assert!(Book::create(BookId::new(), &d, at(9)).is_ok());
    }

    #[test]
    fn create_rejects_bad_price_and_stock() {
        let mut d = details(1);
        d.price = Money::ZERO;
        assert_validation(Book::create(BookId::new(), &d, at(9)), "price");

        assert_validation(Book::create(BookId::new(), &details(-1), at(9)), "stock");
        assert!(Book::create(BookId::new(), &details(0), at(9)).is_ok());
    }

    #[test]
    fn price_and_stock_are_capped() {
        let mut d = details(MAX_QUANTITY);
        d.price = Money::MAX_PRICE;
        assert!(Book::create(BookId::new(), &d, at(9)).is_ok());

        d.price = Money::from_cents(Money::MAX_PRICE.cents() + 1);
        assert_validation(Book::create(BookId::new(), &d, at(9)), "price");

        d.price = Money::from_cents(i64::MAX / 2 + 1);
        assert_validation(Book::create(BookId::new(), &d, at(9)), "price");

        let d = details(MAX_QUANTITY + 1);
        assert_validation(Book::create(BookId::new(), &d, at(9)), "stock");
    }

    #[test]
    fn update_keeps_identity_and_creation_time() {
        let id = BookId::new();
        let mut book = Book::create(id, &details(5), at(9)).unwrap();
        let mut d = details(7);
        d.title = "The Hobbit (Illustrated)".to_string();
        d.price = Money::from_cents(2499);
        book.update(&d).unwrap();

        assert_eq!(book.id_typed(), id);
        assert_eq!(book.created_at(), at(9));
        assert_eq!(book.title(), "The Hobbit (Illustrated)");
        assert_eq!(book.price(), Money::from_cents(2499));
        assert_eq!(book.stock(), 7);
    }

    #[test]
    fn failed_update_leaves_book_untouched() {
        let mut book = Book::create(BookId::new(), &details(5), at(9)).unwrap();
        let before = book.clone();
        let mut d = details(5);
        d.author = String::new();
        assert!(book.update(&d).is_err());
        assert_eq!(book, before);
    }

    #[test]
    fn remove_stock_rejects_oversell() {
        let mut book = Book::create(BookId::new(), &details(2), at(9)).unwrap();
        let err = book.remove_stock(3).unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(3, 2));
        assert_eq!(book.stock(), 2);
    }

    #[test]
    fn remove_stock_rejects_non_positive_quantity() {
        let mut book = Book::create(BookId::new(), &details(2), at(9)).unwrap();
        assert!(matches!(book.remove_stock(0), Err(DomainError::Validation(_))));
        assert!(matches!(book.remove_stock(-1), Err(DomainError::Validation(_))));
    }

    #[test]
    fn description_snapshot_format() {
        let book = Book::create(BookId::new(), &details(1), at(9)).unwrap();
        assert_eq!(book.description(), "The Hobbit by J.R.R. Tolkien (978-0547928227)");
    }

    #[test]
    fn catalogue_order_is_newest_first_then_title() {
        let mk = |title: &str, hour| {
            let mut d = details(1);
            d.title = title.to_string();
            Book::create(BookId::new(), &d, at(hour)).unwrap()
        };
        let mut books = vec![mk("B", 9), mk("A", 10), mk("C", 10)];
        books.sort_by(catalogue_order);
        let titles: Vec<_> = books.iter().map(Book::title).collect();
        assert_eq!(titles, vec!["A", "C", "B"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: removing `1..=stock` copies leaves exactly `stock - q` and never
        /// drives stock negative; anything larger is rejected with stock unchanged.
        #[test]
        fn stock_never_goes_negative(stock in 0i64..500, q in 1i64..1000) {
            let mut book = Book::create(BookId::new(), &details(stock), at(9)).unwrap();
            match book.remove_stock(q) {
                Ok(()) => {
                    prop_assert!(q <= stock);
                    prop_assert_eq!(book.stock(), stock - q);
                }
                Err(e) => {
                    prop_assert!(q > stock);
                    prop_assert_eq!(e, DomainError::insufficient_stock(q, stock));
                    prop_assert_eq!(book.stock(), stock);
                }
            }
            prop_assert!(book.stock() >= 0);
        }
    }
}
