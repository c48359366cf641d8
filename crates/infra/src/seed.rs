//! Sample catalogue for a fresh install.

use tracing::info;

use bookshop_core::Money;
use bookshop_inventory::BookDetails;

use crate::service::{BookshopService, Clock, LedgerResult};
use crate::store::LedgerStore;

/// (title, author, isbn, price in cents, stock)
const SAMPLE_BOOKS: &[(&str, &str, &str, i64, i64)] = &[
    ("The Hobbit", "J.R.R. Tolkien", "978-0547928227", 999, 1),
    ("1984", "George Orwell", "978-0451524935", 799, 2),
    ("To Kill a Mockingbird", "Harper Lee", "978-0061120084", 849, 15),
    ("Pride and Prejudice", "Jane Austen", "978-1503290563", 699, 14),
    ("The Great Gatsby", "F. Scott Fitzgerald", "978-0743273565", 749, 13),
    ("Moby-Dick", "Herman Melville", "978-1503280786", 1099, 12),
    ("War and Peace", "Leo Tolstoy", "978-1400079988", 1299, 20),
    ("Crime and Punishment", "Fyodor Dostoevsky", "978-0486415871", 1149, 50),
    ("The Catcher in the Rye", "J.D. Salinger", "978-0316769488", 899, 5),
    ("Brave New World", "Aldous Huxley", "978-0060850524", 789, 100),
    ("The Lord of the Rings", "J.R.R. Tolkien", "978-0618640157", 1499, 70),
    ("Harry Potter and the Sorcerer's Stone", "J.K. Rowling", "978-0590353427", 949, 50),
    ("The Chronicles of Narnia", "C.S. Lewis", "978-0066238500", 879, 30),
    ("Anna Karenina", "Leo Tolstoy", "978-0143035008", 1199, 30),
    ("The Alchemist", "Paulo Coelho", "978-0061122415", 829, 14),
    ("Les Misérables", "Victor Hugo", "978-0451419439", 1249, 10),
];

pub fn sample_books() -> impl Iterator<Item = BookDetails> {
    SAMPLE_BOOKS
        .iter()
        .map(|&(title, author, isbn, cents, stock)| BookDetails {
            title: title.to_string(),
            author: author.to_string(),
            isbn: isbn.to_string(),
            price: Money::from_cents(cents),
            stock,
        })
}

/// Add the sample catalogue if the store holds no books yet.
///
/// Returns the number of books added (0 when the catalogue was not empty).
pub async fn seed_sample_books<S, C>(service: &BookshopService<S, C>) -> LedgerResult<usize>
where
    S: LedgerStore,
    C: Clock,
{
    if service.store().count_books().await? > 0 {
        return Ok(0);
    }

    let mut added = 0;
    for details in sample_books() {
        service.add_book(&details).await?;
        added += 1;
    }
    info!(added, "seeded sample catalogue");
    Ok(added)
}
