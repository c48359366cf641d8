use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookshop_core::{BookId, DomainError, DomainResult, Entity, MAX_QUANTITY, Money, SaleId};
use bookshop_inventory::Book;

/// Command: sell copies of a book at the counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRequest {
    pub book_id: BookId,
    /// Price charged per copy; may differ from the book's list price.
    pub unit_price: Money,
    pub quantity: i64,
    pub customer_name: Option<String>,
}

/// An immutable record of a completed sale.
///
/// `book_description` is captured at sale time so the record still reads correctly
/// after the book is renamed or repriced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    id: SaleId,
    book_id: BookId,
    book_description: String,
    unit_price: Money,
    quantity: i64,
    sold_at: DateTime<Utc>,
    customer_name: Option<String>,
}

impl Sale {
    /// Build the sale record for `book`. Stock is not touched here; see [`sell`].
    pub fn record(
        id: SaleId,
        book: &Book,
        unit_price: Money,
        quantity: i64,
        customer_name: Option<&str>,
        sold_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be greater than zero"));
        }
        if quantity > MAX_QUANTITY {
            return Err(DomainError::validation(format!(
                "quantity cannot exceed {MAX_QUANTITY}"
            )));
        }
        if !unit_price.is_positive() {
            return Err(DomainError::validation("unit price must be greater than zero"));
        }
        if unit_price > Money::MAX_PRICE {
            return Err(DomainError::validation(format!(
                "unit price cannot exceed {}",
                Money::MAX_PRICE
            )));
        }
        if unit_price.checked_times(quantity).is_none() {
            return Err(DomainError::validation("sale total is too large"));
        }

        let customer_name = customer_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        Ok(Self {
            id,
            book_id: book.id_typed(),
            book_description: book.description(),
            unit_price,
            quantity,
            sold_at,
            customer_name,
        })
    }

    /// Rebuild a sale from persisted columns.
    pub fn restore(
        id: SaleId,
        book_id: BookId,
        book_description: String,
        unit_price: Money,
        quantity: i64,
        sold_at: DateTime<Utc>,
        customer_name: Option<String>,
    ) -> Self {
        Self {
            id,
            book_id,
            book_description,
            unit_price,
            quantity,
            sold_at,
            customer_name,
        }
    }

    pub fn id_typed(&self) -> SaleId {
        self.id
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn book_description(&self) -> &str {
        &self.book_description
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn sold_at(&self) -> DateTime<Utc> {
        self.sold_at
    }

    pub fn customer_name(&self) -> Option<&str> {
        self.customer_name.as_deref()
    }

    /// Customer shown on reports; anonymous sales are walk-ins.
    pub fn customer_label(&self) -> &str {
        self.customer_name().unwrap_or("Walk-in")
    }

    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

impl Entity for Sale {
    type Id = SaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AsRef<Sale> for Sale {
    fn as_ref(&self) -> &Sale {
        self
    }
}

/// Decide a sale against the current state of `book`.
///
/// Checks run in order: quantity against stock, then unit price. On success returns
/// the book with its stock reduced and the sale to append; both must be persisted
/// together. `book` itself is never modified.
pub fn sell(
    book: &Book,
    request: &SaleRequest,
    sale_id: SaleId,
    sold_at: DateTime<Utc>,
) -> DomainResult<(Book, Sale)> {
    if request.book_id != book.id_typed() {
        return Err(DomainError::conflict("sale request targets a different book"));
    }

    let mut updated = book.clone();
    updated.remove_stock(request.quantity)?;

    let sale = Sale::record(
        sale_id,
        book,
        request.unit_price,
        request.quantity,
        request.customer_name.as_deref(),
        sold_at,
    )?;

    Ok((updated, sale))
}
