//! # Askr — Entity Hierarchy and Transform Core
//!
//! The scene-graph heart of a game engine: a fixed-capacity entity pool with
//! generational handles, a parent/child hierarchy with cycle-safe
//! re-parenting, local-to-world transform propagation, per-type component
//! pools with deferred two-phase destruction, and a property-reflection
//! layer that feeds the editor panels and scene serialization.
//!
//! Start with `use askr::prelude::*` and build an
//! [`EntityManager`](entity::EntityManager).

pub mod entity;
pub mod error;
pub mod math;
pub mod prelude;
pub mod property;
pub mod scene;

#[cfg(feature = "editor")]
pub mod editor;
