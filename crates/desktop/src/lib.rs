//! `bookshop-desktop`
//!
//! **Responsibility:** presentation boundary of the bookshop ledger.
//!
//! This crate provides:
//! - Application bootstrap (settings, logging, database, sample data)
//! - Book management, point-of-sale and sales report controllers
//! - Translation of ledger errors into user-facing [`Notice`]s
//!
//! Controllers own their view state and only change it after the awaited ledger
//! call has returned. Rendering is left to whichever UI shell embeds them.

pub mod books;
pub mod point_of_sale;
pub mod report;
pub mod state;
pub mod types;

pub use books::BookManagement;
pub use point_of_sale::{CartLine, PointOfSale};
pub use report::SalesReport;
pub use state::{AppState, Ledger};
pub use types::{BookForm, Notice, NoticeLevel};
