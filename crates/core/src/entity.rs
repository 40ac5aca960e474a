//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Name used when reporting a missing record (e.g. "requisition").
    const KIND: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Build the `NotFound` error for an entity type.
pub fn not_found<E: Entity>(id: &E::Id) -> crate::DomainError {
    crate::DomainError::not_found(E::KIND, id)
}
