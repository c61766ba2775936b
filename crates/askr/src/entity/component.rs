//! # Component — Per-Type Pools Keyed by Entity
//!
//! Components are plain data with a polymorphic update contract. An entity
//! never owns component memory: each component type lives in its own
//! [`ComponentPool<T>`], keyed by the owning entity's slot id, and the entity
//! keeps only a back-reference (the `TypeId`) so the manager can route
//! detach/destroy calls.
//!
//! ## Why `Box<dyn Any>` pools?
//!
//! The manager holds a *dynamic* set of component types — it only knows
//! `TypeId`s at runtime. Each pool is stored as a boxed [`AnyPool`] trait
//! object and downcast back to its concrete `ComponentPool<T>` at the typed
//! call sites. No unsafe code anywhere in the storage layer.
//!
//! ## Pool shape
//!
//! Each pool pairs an id-keyed map with a parallel insertion-order list:
//! the map gives O(1) attach/detach/lookup, the list gives deterministic
//! iteration for the per-frame `update` sweep. Both structures must be kept
//! in sync — detach erases from both.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::math::Transform;

/// The polymorphic component contract.
///
/// `update` runs once per frame for every live component of the type.
/// `transform_updated` is called by the transform-propagation pass after the
/// owning entity's world transform for the frame is final — components that
/// mirror spatial state (renderables, colliders) override it; pure-data
/// components can ignore it.
pub trait Component: 'static {
    fn update(&mut self, dt: f32);

    fn transform_updated(&mut self, _world: &Transform) {}
}

/// Storage for every component of a single type, keyed by owner entity id.
pub(crate) struct ComponentPool<T: Component> {
    entries: HashMap<u32, T>,
    /// Owner ids in attach order; the fast-iteration path for `update_all`.
    order: Vec<u32>,
}

impl<T: Component> ComponentPool<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Insert a component for `id`. The caller (the manager) guarantees the
    /// entity doesn't already have one of this type.
    pub fn insert(&mut self, id: u32, component: T) {
        self.entries.insert(id, component);
        self.order.push(id);
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }
}

/// Type-erased view of a [`ComponentPool`], as stored by the manager.
pub(crate) trait AnyPool {
    /// Whether an entity with this id owns a component in this pool.
    fn contains(&self, id: u32) -> bool;

    /// Erase the component owned by `id` from the map *and* the iteration
    /// list. Returns whether anything was removed.
    fn remove(&mut self, id: u32) -> bool;

    /// Run the per-frame update for every component, in attach order.
    fn update_all(&mut self, dt: f32);

    /// Push a finalized world transform into the component owned by `id`.
    fn push_transform(&mut self, id: u32, world: &Transform);

    fn len(&self) -> usize;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> AnyPool for ComponentPool<T> {
    fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    fn remove(&mut self, id: u32) -> bool {
        if self.entries.remove(&id).is_some() {
            self.order.retain(|&e| e != id);
            true
        } else {
            false
        }
    }

    fn update_all(&mut self, dt: f32) {
        for id in &self.order {
            if let Some(component) = self.entries.get_mut(id) {
                component.update(dt);
            }
        }
    }

    fn push_transform(&mut self, id: u32, world: &Transform) {
        if let Some(component) = self.entries.get_mut(&id) {
            component.transform_updated(world);
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// `TypeId` helper used by the manager's pool map.
pub(crate) fn component_type_id<T: Component>() -> TypeId {
    TypeId::of::<T>()
}

/// Path-stripped type name, for editor display and error messages.
pub(crate) fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        ticks: u32,
        last_position: Transform,
    }

    impl Component for Counter {
        fn update(&mut self, _dt: f32) {
            self.ticks += 1;
        }

        fn transform_updated(&mut self, world: &Transform) {
            self.last_position = *world;
        }
    }

    #[test]
    fn insert_get_remove() {
        let mut pool = ComponentPool::<Counter>::new();
        pool.insert(4, Counter::default());
        assert!(pool.contains(4));
        assert!(pool.get(4).is_some());
        assert!(pool.get(5).is_none());

        assert!(pool.remove(4));
        assert!(!pool.contains(4));
        assert!(!pool.remove(4)); // already gone
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn update_all_visits_in_attach_order() {
        let mut pool = ComponentPool::<Counter>::new();
        pool.insert(2, Counter::default());
        pool.insert(0, Counter::default());
        pool.update_all(0.016);
        pool.update_all(0.016);
        assert_eq!(pool.get(2).unwrap().ticks, 2);
        assert_eq!(pool.get(0).unwrap().ticks, 2);
    }

    #[test]
    fn push_transform_reaches_owner_only() {
        let mut pool = ComponentPool::<Counter>::new();
        pool.insert(1, Counter::default());
        pool.insert(2, Counter::default());

        let world = Transform::from_xyz(9.0, 0.0, 0.0);
        pool.push_transform(1, &world);
        assert_eq!(pool.get(1).unwrap().last_position.position.x, 9.0);
        assert_eq!(pool.get(2).unwrap().last_position.position.x, 0.0);
    }

    #[test]
    fn short_type_name_strips_the_module_path() {
        assert_eq!(short_type_name::<Counter>(), "Counter");
    }
}
