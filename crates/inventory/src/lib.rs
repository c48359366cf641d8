//! Inventory domain module.
//!
//! This crate contains the catalogue rules for books (field validation, stock
//! removal), implemented purely as deterministic domain logic (no IO, no storage).

pub mod book;

pub use book::{AUTHOR_MAX_LEN, Book, BookDetails, ISBN_MAX_LEN, TITLE_MAX_LEN, catalogue_order};
