//! Shared view types.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use bookshop_core::{MAX_QUANTITY, Money};
use bookshop_infra::LedgerError;
use bookshop_inventory::{Book, BookDetails};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A message for the user, shown as a dialog or status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Wrap a ledger failure in wording meant for the person at the counter.
    pub fn from_ledger(title: impl Into<String>, err: &LedgerError) -> Self {
        let message = match err {
            LedgerError::Validation(msg) => format!("Please check the input: {msg}."),
            LedgerError::NotFound(_) => {
                "The book no longer exists. Refresh the list and try again.".to_string()
            }
            LedgerError::Conflict(msg) => format!("The change was refused: {msg}."),
            LedgerError::InsufficientStock {
                requested,
                available,
            } => format!("Only {available} copies in stock; cannot sell {requested}."),
            LedgerError::Storage(msg) => format!("The database could not be reached: {msg}"),
        };
        Self::error(title, message)
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

/// Text fields of the add/edit book form, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub price: String,
    pub stock: String,
}

impl BookForm {
    pub fn from_book(book: &Book) -> Self {
        Self {
            title: book.title().to_string(),
            author: book.author().to_string(),
            isbn: book.isbn().to_string(),
            price: book.price().to_string(),
            stock: book.stock().to_string(),
        }
    }

    /// Parse the numeric fields. Text rules are left to the ledger.
    pub fn parse(&self) -> Result<BookDetails, String> {
        let price = Money::from_str(self.price.trim())
            .map_err(|_| format!("'{}' is not a valid price", self.price.trim()))?;
        if price > Money::MAX_PRICE {
            return Err(format!("price cannot exceed {}", Money::MAX_PRICE));
        }
        let stock = self
            .stock
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("'{}' is not a whole number of copies", self.stock.trim()))?;
        if stock > MAX_QUANTITY {
            return Err(format!("stock cannot exceed {MAX_QUANTITY}"));
        }

        Ok(BookDetails {
            title: self.title.clone(),
            author: self.author.clone(),
            isbn: self.isbn.clone(),
            price,
            stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(price: &str, stock: &str) -> BookForm {
        BookForm {
            title: "The Alchemist".to_string(),
            author: "Paulo Coelho".to_string(),
            isbn: "978-0061122415".to_string(),
            price: price.to_string(),
            stock: stock.to_string(),
        }
    }

    #[test]
    fn parses_numeric_fields() {
        let details = form(" 8.29 ", "14").parse().unwrap();
        assert_eq!(details.price, Money::from_cents(829));
        assert_eq!(details.stock, 14);
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert!(form("8,29", "14").parse().unwrap_err().contains("price"));
        assert!(form("8.299", "14").parse().is_err());
        assert!(form("8.29", "1.5").parse().unwrap_err().contains("whole number"));
    }

    #[test]
    fn rejects_out_of_range_numbers() {
        let details = form("99999999.99", "2147483647").parse().unwrap();
        assert_eq!(details.price, Money::MAX_PRICE);
        assert_eq!(details.stock, MAX_QUANTITY);

        assert!(form("100000000.00", "1").parse().unwrap_err().contains("price cannot exceed"));
        assert!(form("92233720368547758.07", "1").parse().unwrap_err().contains("price"));
        assert!(form("1.00", "2147483648").parse().unwrap_err().contains("stock cannot exceed"));
    }

    #[test]
    fn insufficient_stock_reads_naturally() {
        let notice = Notice::from_ledger(
            "Sale Failed",
            &LedgerError::InsufficientStock {
                requested: 3,
                available: 1,
            },
        );
        assert!(notice.is_error());
        assert_eq!(notice.message, "Only 1 copies in stock; cannot sell 3.");
    }
}
