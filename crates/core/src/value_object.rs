//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. In this workspace the
/// canonical example is [`Money`](crate::Money): two amounts of 1999 cents are the
/// same amount, wherever they came from. To "modify" a value object, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
