//! `bookshop-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the inventory and sales
//! modules (no storage, no presentation concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{BookId, SaleId};
pub use money::{MAX_QUANTITY, Money};
pub use value_object::ValueObject;
