//! Point-of-sale view: pick in-stock books, build a cart, record the sales.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use bookshop_core::{BookId, Money};
use bookshop_inventory::Book;
use bookshop_sales::SaleRequest;

use crate::state::Ledger;
use crate::types::Notice;

/// One book in the cart, at the price agreed at the counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub book_id: BookId,
    pub title: String,
    pub unit_price: Money,
    pub quantity: i64,
}

impl CartLine {
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

pub struct PointOfSale {
    ledger: Arc<Ledger>,
    available: Vec<Book>,
    selected: Option<BookId>,
    unit_price: Money,
    quantity: i64,
    customer_name: String,
    cart: Vec<CartLine>,
}

impl PointOfSale {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self {
            ledger,
            available: Vec::new(),
            selected: None,
            unit_price: Money::ZERO,
            quantity: 1,
            customer_name: String::new(),
            cart: Vec::new(),
        }
    }

    /// Books with stock left, newest first.
    pub fn available_books(&self) -> &[Book] {
        &self.available
    }

    pub fn selected(&self) -> Option<&Book> {
        let id = self.selected?;
        self.available.iter().find(|b| b.id_typed() == id)
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn cart(&self) -> &[CartLine] {
        &self.cart
    }

    pub fn cart_total(&self) -> Money {
        self.cart.iter().map(CartLine::line_total).sum()
    }

    /// Reload the in-stock books. On failure the list is emptied and a notice returned.
    pub async fn refresh(&mut self) -> Option<Notice> {
        match self.ledger.available_books().await {
            Ok(books) => {
                self.available = books;
                if self.selected().is_none() {
                    self.selected = None;
                }
                None
            }
            Err(e) => {
                self.available.clear();
                self.selected = None;
                Some(Notice::from_ledger("Load Books", &e))
            }
        }
    }

    /// Select a book; the unit price defaults to its list price.
    pub fn select(&mut self, id: Option<BookId>) {
        self.selected = id;
        match self.selected().map(Book::price) {
            Some(price) => self.unit_price = price,
            None => {
                self.selected = None;
                self.unit_price = Money::ZERO;
            }
        }
    }

    pub fn set_unit_price(&mut self, price: Money) {
        self.unit_price = price;
    }

    pub fn set_quantity(&mut self, quantity: i64) {
        self.quantity = quantity;
    }

    pub fn set_customer_name(&mut self, name: impl Into<String>) {
        self.customer_name = name.into();
    }

    fn in_cart(&self, id: BookId) -> i64 {
        self.cart
            .iter()
            .filter(|l| l.book_id == id)
            .fold(0i64, |acc, l| acc.saturating_add(l.quantity))
    }

    /// A book is selected, price and quantity are positive and in range, and the stock
    /// covers the quantity together with what is already in the cart.
    pub fn can_sell(&self) -> bool {
        match self.selected() {
            Some(book) => {
                self.quantity > 0
                    && self.unit_price.is_positive()
                    && self.unit_price <= Money::MAX_PRICE
                    && self.in_cart(book.id_typed()).saturating_add(self.quantity) <= book.stock()
            }
            None => false,
        }
    }

    /// Put the current selection in the cart; merges with a line of the same book and
    /// price. Quantity resets to one.
    pub fn add_to_cart(&mut self) -> bool {
        if !self.can_sell() {
            return false;
        }
        let Some(book) = self.selected() else {
            return false;
        };
        let (book_id, title) = (book.id_typed(), book.title().to_string());

        match self
            .cart
            .iter_mut()
            .find(|l| l.book_id == book_id && l.unit_price == self.unit_price)
        {
            Some(line) => line.quantity = line.quantity.saturating_add(self.quantity),
            None => self.cart.push(CartLine {
                book_id,
                title,
                unit_price: self.unit_price,
                quantity: self.quantity,
            }),
        }
        self.quantity = 1;
        true
    }

    pub fn remove_from_cart(&mut self, index: usize) -> Option<CartLine> {
        (index < self.cart.len()).then(|| self.cart.remove(index))
    }

    pub fn clear(&mut self) {
        self.cart.clear();
        self.customer_name.clear();
        self.quantity = 1;
    }

    pub fn can_complete(&self) -> bool {
        !self.cart.is_empty()
    }

    fn request(&self, book_id: BookId, unit_price: Money, quantity: i64) -> SaleRequest {
        SaleRequest {
            book_id,
            unit_price,
            quantity,
            customer_name: Some(self.customer_name.clone()),
        }
    }

    /// Sell the selection straight away, without the cart.
    pub async fn sell_selected(&mut self) -> Notice {
        let Some(book) = self.selected() else {
            return Notice::error("Sale Failed", "Select a book to sell.");
        };
        let title = book.title().to_string();
        let request = self.request(book.id_typed(), self.unit_price, self.quantity);

        let notice = match self.ledger.try_sell_book(&request).await {
            Ok(true) => Notice::info(
                "Sale Completed",
                format!(
                    "Sold {} x {title} for {}.",
                    request.quantity,
                    request.unit_price.times(request.quantity)
                ),
            ),
            Ok(false) => Notice::error(
                "Sale Failed",
                format!("The sale of {title} was rejected. Check the quantity and price."),
            ),
            Err(e) => Notice::from_ledger("Sale Failed", &e),
        };

        if !notice.is_error() {
            self.quantity = 1;
        }
        if let Some(refresh) = self.refresh().await {
            return refresh;
        }
        notice
    }

    /// Record every cart line as its own sale.
    ///
    /// Lines that were sold leave the cart; rejected lines stay for the user to fix.
    /// A storage failure stops at the failing line.
    pub async fn complete_sale(&mut self) -> Notice {
        if !self.can_complete() {
            return Notice::error("Sale Failed", "The cart is empty.");
        }

        let mut sold = 0usize;
        let mut total = Money::ZERO;
        let mut rejected = Vec::new();
        let mut remaining = Vec::new();
        let mut lines = std::mem::take(&mut self.cart).into_iter();

        while let Some(line) = lines.next() {
            let request = self.request(line.book_id, line.unit_price, line.quantity);
            match self.ledger.sell_book(&request).await {
                Ok(sale) => {
                    sold += 1;
                    total += sale.line_total();
                }
                Err(e) if e.is_storage() => {
                    warn!(error = %e, "sale interrupted by storage failure");
                    remaining.push(line);
                    remaining.extend(lines.by_ref());
                    self.cart = remaining;
                    let _ = self.refresh().await;
                    return Notice::from_ledger("Sale Failed", &e);
                }
                Err(e) => {
                    rejected.push(format!("{}: {e}", line.title));
                    remaining.push(line);
                }
            }
        }

        self.cart = remaining;
        let refresh = self.refresh().await;

        if rejected.is_empty() {
            self.customer_name.clear();
            if let Some(notice) = refresh {
                return notice;
            }
            Notice::info(
                "Sale Completed",
                format!("Recorded {sold} sale(s) totalling {total}."),
            )
        } else {
            Notice::error(
                "Sale Incomplete",
                format!(
                    "Recorded {sold} sale(s) totalling {total}. Not sold:\n{}",
                    rejected.join("\n")
                ),
            )
        }
    }
}
