//! Book management view: catalogue list with add, edit and delete.

use std::sync::Arc;

use bookshop_core::BookId;
use bookshop_inventory::Book;

use crate::state::Ledger;
use crate::types::{BookForm, Notice};

#[derive(Debug, Clone)]
struct EditSession {
    /// `None` while adding a new book.
    book_id: Option<BookId>,
    form: BookForm,
}

pub struct BookManagement {
    ledger: Arc<Ledger>,
    books: Vec<Book>,
    selected: Option<BookId>,
    editing: Option<EditSession>,
}

impl BookManagement {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self {
            ledger,
            books: Vec::new(),
            selected: None,
            editing: None,
        }
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn selected(&self) -> Option<&Book> {
        let id = self.selected?;
        self.books.iter().find(|b| b.id_typed() == id)
    }

    /// Select a row of the list; ids not in the list clear the selection.
    pub fn select(&mut self, id: Option<BookId>) {
        self.selected = id.filter(|id| self.books.iter().any(|b| b.id_typed() == *id));
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn form(&self) -> Option<&BookForm> {
        self.editing.as_ref().map(|s| &s.form)
    }

    pub fn form_mut(&mut self) -> Option<&mut BookForm> {
        self.editing.as_mut().map(|s| &mut s.form)
    }

    pub fn can_add(&self) -> bool {
        !self.is_editing()
    }

    pub fn can_edit(&self) -> bool {
        self.selected().is_some() && !self.is_editing()
    }

    pub fn can_delete(&self) -> bool {
        self.can_edit()
    }

    pub fn can_save(&self) -> bool {
        self.is_editing()
    }

    /// Reload the catalogue. On failure the list is emptied and a notice returned.
    pub async fn refresh(&mut self) -> Option<Notice> {
        match self.ledger.list_books().await {
            Ok(books) => {
                self.books = books;
                self.select(self.selected);
                None
            }
            Err(e) => {
                self.books.clear();
                self.selected = None;
                Some(Notice::from_ledger("Load Books", &e))
            }
        }
    }

    /// Open an empty form for a new book.
    pub fn begin_add(&mut self) -> bool {
        if !self.can_add() {
            return false;
        }
        self.editing = Some(EditSession {
            book_id: None,
            form: BookForm::default(),
        });
        true
    }

    /// Open the form pre-filled with the selected book.
    pub fn begin_edit(&mut self) -> bool {
        if !self.can_edit() {
            return false;
        }
        self.editing = self.selected().map(|book| EditSession {
            book_id: Some(book.id_typed()),
            form: BookForm::from_book(book),
        });
        self.editing.is_some()
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Submit the form. The form stays open on failure so the user can correct it.
    pub async fn save(&mut self) -> Result<Book, Notice> {
        let Some(session) = self.editing.clone() else {
            return Err(Notice::error("Save Book", "Nothing is being edited."));
        };
        let details = session
            .form
            .parse()
            .map_err(|msg| Notice::error("Save Book", msg))?;

        let saved = match session.book_id {
            None => self.ledger.add_book(&details).await,
            Some(id) => self.ledger.update_book(id, &details).await,
        }
        .map_err(|e| Notice::from_ledger("Save Book", &e))?;

        self.editing = None;
        self.selected = Some(saved.id_typed());
        if let Some(notice) = self.refresh().await {
            return Err(notice);
        }
        Ok(saved)
    }

    /// Delete the selected book.
    pub async fn delete_selected(&mut self) -> Result<(), Notice> {
        if !self.can_delete() {
            return Err(Notice::error("Delete Book", "Select a book to delete."));
        }
        let Some(id) = self.selected else {
            return Err(Notice::error("Delete Book", "Select a book to delete."));
        };

        self.ledger
            .delete_book(id)
            .await
            .map_err(|e| Notice::from_ledger("Delete Book", &e))?;

        self.selected = None;
        match self.refresh().await {
            Some(notice) => Err(notice),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use bookshop_core::Money;
    use bookshop_sales::SaleRequest;

    fn fill(form: &mut BookForm, title: &str, isbn: &str, price: &str, stock: &str) {
        form.title = title.to_string();
        form.author = "Jane Austen".to_string();
        form.isbn = isbn.to_string();
        form.price = price.to_string();
        form.stock = stock.to_string();
    }

    #[tokio::test]
    async fn add_edit_delete_cycle() {
        let state = AppState::in_memory();
        let mut view = state.book_management();
        assert!(view.refresh().await.is_none());
        assert!(!view.can_edit());

        assert!(view.begin_add());
        assert!(!view.can_add());
        fill(view.form_mut().unwrap(), "Emma", "978-0141439587", "6.50", "4");
        let added = view.save().await.unwrap();
        assert!(!view.is_editing());
        assert_eq!(view.books().len(), 1);
        assert_eq!(view.selected().map(Book::id_typed), Some(added.id_typed()));

        assert!(view.begin_edit());
        assert_eq!(view.form().unwrap().price, "6.50");
        view.form_mut().unwrap().stock = "9".to_string();
        let updated = view.save().await.unwrap();
        assert_eq!(updated.stock(), 9);
        assert_eq!(updated.created_at(), added.created_at());

        view.delete_selected().await.unwrap();
        assert!(view.books().is_empty());
        assert!(view.selected().is_none());
    }

    #[tokio::test]
    async fn invalid_form_keeps_editing() {
        let state = AppState::in_memory();
        let mut view = state.book_management();

        view.begin_add();
        fill(view.form_mut().unwrap(), "Emma", "978-0141439587", "abc", "4");
        let notice = view.save().await.unwrap_err();
        assert!(notice.message.contains("not a valid price"));
        assert!(view.is_editing());

        fill(view.form_mut().unwrap(), "", "978-0141439587", "6.50", "4");
        assert!(view.save().await.unwrap_err().is_error());
        assert!(view.is_editing());

        view.cancel_edit();
        assert!(!view.is_editing());
        assert!(view.books().is_empty());
    }

    #[tokio::test]
    async fn sold_book_cannot_be_deleted() {
        let state = AppState::in_memory();
        let mut view = state.book_management();
        view.begin_add();
        fill(view.form_mut().unwrap(), "Emma", "978-0141439587", "6.50", "4");
        let book = view.save().await.unwrap();

        state
            .ledger()
            .sell_book(&SaleRequest {
                book_id: book.id_typed(),
                unit_price: Money::from_cents(650),
                quantity: 1,
                customer_name: None,
            })
            .await
            .unwrap();

        let notice = view.delete_selected().await.unwrap_err();
        assert!(notice.message.starts_with("The change was refused"));
        assert_eq!(view.books().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_isbn_is_reported() {
        let state = AppState::in_memory();
        let mut view = state.book_management();
        for title in ["Emma", "Persuasion"] {
            view.begin_add();
            fill(view.form_mut().unwrap(), title, "978-0141439587", "6.50", "4");
            let _ = view.save().await;
        }
        assert!(view.is_editing());
        assert_eq!(view.books().len(), 1);
    }
}
