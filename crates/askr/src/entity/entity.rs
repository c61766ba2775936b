//! # Entity — A Slot in the Fixed Pool
//!
//! An [`Entity`] is not allocated or freed; it is one of a fixed array of
//! slots owned by the [`EntityManager`](super::EntityManager), flipping
//! between [`EntityState::Inactive`] and [`EntityState::Active`] as the slot
//! is handed out and reclaimed.
//!
//! ## Lifecycle
//!
//! ```text
//! Inactive ──allocate──▶ Active ──destroy──▶ (pending) ──cleanup──▶ Inactive
//!     ▲                                                                │
//!     └──────────────────── generation += 1 ◀────────────────────────-─┘
//! ```
//!
//! `destroy` does not touch the slot — the manager records the handle in a
//! pending list and keeps the entity fully usable until `cleanup` runs at the
//! end of the frame. Only `cleanup` resets the slot and bumps the generation,
//! which is what invalidates outstanding handles.
//!
//! ## Cached world transform
//!
//! Each slot caches its world-space transform together with a dirty bit. Any
//! local-transform write (or a re-parent) marks the slot and its whole
//! subtree dirty; the cache is refilled either by the per-frame propagation
//! pass or lazily by [`EntityManager::world_transform`].

use std::any::TypeId;

use crate::entity::EntityHandle;
use crate::math::Transform;

/// Whether a slot currently hosts a live entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityState {
    #[default]
    Inactive,
    Active,
}

/// One slot of the entity pool. All hierarchy and transform state lives
/// here; component data lives in the per-type pools.
pub struct Entity {
    pub(crate) id: u32,
    pub(crate) generation: u32,
    /// Stable identifier, never recycled. Survives save/load remapping of
    /// slot ids.
    pub(crate) uid: u64,
    pub(crate) name: String,
    pub(crate) state: EntityState,

    pub(crate) local: Transform,
    pub(crate) world: Transform,
    pub(crate) world_dirty: bool,

    pub(crate) parent: Option<EntityHandle>,
    pub(crate) children: Vec<EntityHandle>,

    /// Component types attached to this entity, in attach order. The data
    /// itself lives in the manager's pools.
    pub(crate) components: Vec<TypeId>,
}

impl Entity {
    pub(crate) fn new(id: u32) -> Self {
        Self {
            id,
            generation: 0,
            uid: 0,
            name: String::new(),
            state: EntityState::Inactive,
            local: Transform::IDENTITY,
            world: Transform::IDENTITY,
            world_dirty: false,
            parent: None,
            children: Vec::new(),
            components: Vec::new(),
        }
    }

    /// The handle this slot currently answers to.
    pub fn handle(&self) -> EntityHandle {
        EntityHandle {
            index: self.id,
            generation: self.generation,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Stable identifier, unique across the manager's lifetime.
    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    pub fn local_transform(&self) -> &Transform {
        &self.local
    }

    /// The cached world transform as of the last propagation pass or lazy
    /// refresh. May be stale if the dirty flag is set; prefer
    /// [`EntityManager::world_transform`](super::EntityManager::world_transform)
    /// unless you know a pass just ran.
    pub fn world_transform_cached(&self) -> Transform {
        self.world
    }

    pub fn parent(&self) -> Option<EntityHandle> {
        self.parent
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    pub fn children(&self) -> &[EntityHandle] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// `TypeId`s of attached components, in attach order.
    pub fn component_types(&self) -> &[TypeId] {
        &self.components
    }

    /// Return the slot to pool state: wipe everything except `id` and bump
    /// the generation so outstanding handles stop resolving.
    pub(crate) fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.uid = 0;
        self.name.clear();
        self.state = EntityState::Inactive;
        self.local = Transform::IDENTITY;
        self.world = Transform::IDENTITY;
        self.world_dirty = false;
        self.parent = None;
        self.children.clear();
        self.components.clear();
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("parent", &self.parent)
            .field("children", &self.children.len())
            .finish()
    }
}
