//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Books and sales are entities: two records with the same field values but different
/// identifiers are different records.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
