//! Entity pool, hierarchy, components, and the manager that drives them.
//!
//! Split by concern:
//! - [`handle`]: generational weak references into the pool.
//! - [`entity`]: the slot type holding transforms and hierarchy links.
//! - [`component`]: per-type component pools and the update contract.
//! - [`manager`]: the owner of all of the above plus the frame driver.

pub mod component;
#[allow(clippy::module_inception)]
pub mod entity;
pub mod handle;
pub mod manager;

pub use component::Component;
pub use entity::{Entity, EntityState};
pub use handle::EntityHandle;
pub use manager::{EntityManager, MAX_ENTITIES, Propagate};
