//! Error taxonomy for the entity core.
//!
//! Every mutating call on the [`EntityManager`](crate::entity::EntityManager)
//! returns a `Result` so callers — the editor in particular, where mutations
//! are driven by user gestures — can surface a "cannot attach" state instead
//! of crashing. Nothing here panics in library code.

use thiserror::Error;

/// Why an entity-manager operation was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EntityError {
    /// The fixed entity pool has no inactive slot left.
    #[error("entity pool exhausted ({capacity} slots)")]
    ResourceExhausted { capacity: usize },

    /// The handle is stale, out of range, or refers to an inactive slot.
    #[error("invalid or stale entity handle")]
    InvalidHandle,

    /// An entity cannot be parented to itself.
    #[error("cannot parent an entity to itself")]
    SelfParent,

    /// The entity already has a parent; detach it first.
    #[error("entity already has a parent")]
    AlreadyParented,

    /// The entity has no parent to remove.
    #[error("entity has no parent")]
    NotParented,

    /// The requested child is not a child of the given parent.
    #[error("entity is not a child of the given parent")]
    NotAChild,

    /// Re-parenting would make an entity its own ancestor.
    #[error("re-parenting would create a cycle")]
    WouldCreateCycle,

    /// The entity is already marked for deferred destruction.
    #[error("entity is already marked for destruction")]
    AlreadyDestroyed,

    /// The component type was never registered with the manager.
    #[error("component type `{name}` is not registered")]
    UnknownComponentType { name: &'static str },

    /// The entity already has a component of this type attached.
    #[error("entity already has a `{name}` component")]
    DuplicateComponent { name: &'static str },

    /// The entity has no component of this type to detach.
    #[error("entity has no `{name}` component")]
    MissingComponent { name: &'static str },

    /// The property cannot be written through the reflection layer.
    #[error("property is read-only")]
    ReadOnlyProperty,

    /// The value's variant does not match the property's declared type.
    #[error("property value has the wrong type")]
    PropertyTypeMismatch,
}
