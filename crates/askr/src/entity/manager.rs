//! # EntityManager — Pool, Hierarchy, and Lifecycle Driver
//!
//! The manager owns everything: the fixed array of entity slots, the sorted
//! list of root entities (the transform-propagation entry points), the
//! active-entity list, the deferred-destruction list, and one type-erased
//! component pool per registered component type.
//!
//! ## Design
//!
//! ```text
//! EntityManager
//! ├── slots:   [Entity; capacity]        fixed pool, recycled in place
//! ├── active:  Vec<EntityHandle>         fast iteration for gameplay code
//! ├── roots:   Vec<u32> (sorted by id)   parentless entities only
//! ├── pending: Vec<EntityHandle>         destroyed this frame, not yet reclaimed
//! └── pools:   TypeId → Box<dyn AnyPool> component storage, keyed by owner id
//! ```
//!
//! Three invariants hold between any two public calls:
//!
//! 1. Every active, parentless entity appears in `roots` exactly once, and
//!    `roots` stays sorted by id so traversal order is deterministic.
//! 2. The parent/child graph is a forest. Re-parenting is cycle-checked at
//!    the API boundary, so a back-edge can never exist even transiently.
//! 3. An entity's world-transform cache is either clean (both the per-frame
//!    propagation pass and the lazy accessors agree on it, bit for bit) or
//!    dirty along the whole subtree below the stale write.
//!
//! ## Frame shape
//!
//! `update(dt)` runs the three phases in a fixed order: component updates,
//! then transform propagation from the roots, then destruction cleanup.
//! `destroy` only records intent, which is what makes it safe to call from
//! inside any of those phases, including mid-iteration over active entities.
//!
//! There are no globals here. Construct a manager, thread it through
//! explicitly.

use std::any::TypeId;
use std::collections::HashMap;

use log::{debug, warn};

use crate::entity::component::{
    AnyPool, Component, ComponentPool, component_type_id, short_type_name,
};
use crate::entity::entity::{Entity, EntityState};
use crate::entity::handle::EntityHandle;
use crate::error::EntityError;
use crate::math::{Quat, Transform, Vec3};

/// Default slot count for [`EntityManager::new`].
pub const MAX_ENTITIES: usize = 4096;

/// Whether a local-transform write is pushed into the entity's components
/// right away, or left for the next propagation pass to pick up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagate {
    /// Recompute this entity's world transform now and notify its
    /// components. Descendants are still deferred to the next pass.
    Immediate,
    /// Mark the subtree dirty and let the next pass handle it.
    Deferred,
}

pub struct EntityManager {
    slots: Vec<Entity>,
    /// Rolling allocation cursor; scanning resumes where the last
    /// allocation left off so ids churn evenly through the pool.
    cursor: usize,
    active: Vec<EntityHandle>,
    /// Ids of active, parentless entities, sorted ascending.
    roots: Vec<u32>,
    pending_destroy: Vec<EntityHandle>,
    pools: HashMap<TypeId, Box<dyn AnyPool>>,
    /// Monotonic, never recycled. Seeds each entity's stable uid.
    next_uid: u64,
}

impl EntityManager {
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTITIES)
    }

    /// A manager with a custom pool size. Mostly for tests; games want the
    /// default.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity as u32).map(Entity::new).collect(),
            cursor: 0,
            active: Vec::new(),
            roots: Vec::new(),
            pending_destroy: Vec::new(),
            pools: HashMap::new(),
            next_uid: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Handles of all active entities, in allocation order. Entities pending
    /// destruction are still listed until [`cleanup`](Self::cleanup) runs.
    pub fn active_entities(&self) -> &[EntityHandle] {
        &self.active
    }

    /// Handles of all active, parentless entities, ordered by id.
    pub fn roots(&self) -> Vec<EntityHandle> {
        self.roots
            .iter()
            .map(|&id| self.slots[id as usize].handle())
            .collect()
    }

    // ── Pool ────────────────────────────────────────────────────────────

    /// Claim the next inactive slot, scanning forward from the rolling
    /// cursor with wrap-around.
    pub fn allocate(&mut self) -> Result<EntityHandle, EntityError> {
        let capacity = self.slots.len();
        for offset in 0..capacity {
            let idx = (self.cursor + offset) % capacity;
            if self.slots[idx].state == EntityState::Inactive {
                self.cursor = (idx + 1) % capacity;
                let uid = self.next_uid;
                self.next_uid += 1;

                let slot = &mut self.slots[idx];
                slot.state = EntityState::Active;
                slot.uid = uid;
                slot.name = format!("entity_{idx}");
                let handle = slot.handle();

                self.active.push(handle);
                self.insert_root(idx as u32);
                return Ok(handle);
            }
        }
        warn!("entity pool exhausted at {capacity} slots");
        Err(EntityError::ResourceExhausted { capacity })
    }

    /// Resolve a handle. `None` for out-of-range, inactive, or stale
    /// (recycled-slot) handles.
    pub fn get(&self, handle: EntityHandle) -> Option<&Entity> {
        let slot = self.slots.get(handle.index as usize)?;
        (slot.state == EntityState::Active && slot.generation == handle.generation).then_some(slot)
    }

    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        (slot.state == EntityState::Active && slot.generation == handle.generation).then_some(slot)
    }

    fn resolve(&self, handle: EntityHandle) -> Result<u32, EntityError> {
        self.get(handle)
            .map(|e| e.id)
            .ok_or(EntityError::InvalidHandle)
    }

    // ── Deferred destruction ────────────────────────────────────────────

    /// Mark an entity for destruction at the end of the frame. The entity
    /// stays active and iterable until [`cleanup`](Self::cleanup).
    pub fn destroy(&mut self, handle: EntityHandle) -> Result<(), EntityError> {
        let id = self.resolve(handle)?;
        if self.pending_destroy.iter().any(|h| h.index == id) {
            return Err(EntityError::AlreadyDestroyed);
        }
        self.pending_destroy.push(self.slots[id as usize].handle());
        Ok(())
    }

    /// Whether the entity is live but marked for destruction this frame.
    pub fn is_pending_destroy(&self, handle: EntityHandle) -> bool {
        self.get(handle)
            .is_some_and(|e| self.pending_destroy.iter().any(|h| h.index == e.id))
    }

    /// Reclaim every entity destroyed this frame: detach its components,
    /// unlink it from the hierarchy, promote its children to roots, and
    /// return the slot to the pool.
    ///
    /// Called from [`update`](Self::update); call it directly only when
    /// stepping phases by hand.
    pub fn cleanup(&mut self) {
        let pending = std::mem::take(&mut self.pending_destroy);
        if !pending.is_empty() {
            debug!("cleaning up {} destroyed entities", pending.len());
        }
        for handle in pending {
            // A parent cleaned up earlier in this same pass may have already
            // promoted us; re-resolve rather than trusting the stored handle.
            let Some(id) = self.get(handle).map(|e| e.id) else {
                continue;
            };

            for type_id in std::mem::take(&mut self.slots[id as usize].components) {
                if let Some(pool) = self.pools.get_mut(&type_id) {
                    pool.remove(id);
                }
            }

            match self.slots[id as usize].parent {
                Some(parent) => {
                    if let Some(p) = self.get_mut(parent) {
                        p.children.retain(|c| c.index != id);
                    }
                }
                None => self.remove_root(id),
            }

            // Promote children to roots, freezing each one's current world
            // transform so nothing jumps.
            for child in std::mem::take(&mut self.slots[id as usize].children) {
                let Some(child_id) = self.get(child).map(|e| e.id) else {
                    continue;
                };
                self.refresh_world(child_id);
                let child_slot = &mut self.slots[child_id as usize];
                child_slot.local = child_slot.world;
                child_slot.world = child_slot.local.world_from(&Transform::IDENTITY);
                child_slot.world_dirty = false;
                child_slot.parent = None;
                self.insert_root(child_id);
                self.mark_children_dirty(child_id);
            }

            self.active.retain(|h| h.index != id);
            self.slots[id as usize].reset();
        }
    }

    // ── Hierarchy ───────────────────────────────────────────────────────

    /// Whether `ancestor` appears in `entity`'s parent chain (the entity is
    /// not its own ancestor).
    pub fn is_ancestor_of(&self, ancestor: EntityHandle, entity: EntityHandle) -> bool {
        let Some(mut current) = self.get(entity).and_then(|e| e.parent) else {
            return false;
        };
        loop {
            if current.index == ancestor.index {
                return self.get(ancestor).is_some();
            }
            match self.get(current).and_then(|e| e.parent) {
                Some(next) => current = next,
                None => return false,
            }
        }
    }

    /// Whether attaching `child` under `parent` would be accepted. The
    /// editor calls this per hover target to drive its preview label.
    pub fn can_parent(&self, parent: EntityHandle, child: EntityHandle) -> bool {
        self.get(parent).is_some()
            && self.get(child).is_some()
            && parent.index != child.index
            && !self.is_ancestor_of(child, parent)
    }

    /// Attach `child` under `parent`. The child's local transform is
    /// recomputed relative to the parent so its world transform is
    /// unchanged, and the child leaves the root list.
    pub fn set_parent(
        &mut self,
        child: EntityHandle,
        parent: EntityHandle,
    ) -> Result<(), EntityError> {
        let child_id = self.resolve(child)?;
        let parent_id = self.resolve(parent)?;
        if child_id == parent_id {
            return Err(EntityError::SelfParent);
        }
        if self.slots[child_id as usize].parent.is_some() {
            return Err(EntityError::AlreadyParented);
        }
        if self.is_ancestor_of(child, parent) {
            return Err(EntityError::WouldCreateCycle);
        }

        self.refresh_world(parent_id);
        self.refresh_world(child_id);
        let parent_world = self.slots[parent_id as usize].world;
        let parent_handle = self.slots[parent_id as usize].handle();
        let child_handle = self.slots[child_id as usize].handle();

        let child_slot = &mut self.slots[child_id as usize];
        child_slot.local = child_slot.world.relative_to(&parent_world);
        // Re-run the composition so the cache holds exactly what the next
        // propagation pass will produce for the rewritten local.
        child_slot.world = child_slot.local.world_from(&parent_world);
        child_slot.world_dirty = false;
        child_slot.parent = Some(parent_handle);

        self.slots[parent_id as usize].children.push(child_handle);
        self.remove_root(child_id);
        self.mark_children_dirty(child_id);
        Ok(())
    }

    /// [`set_parent`](Self::set_parent) from the parent's side. Attaching an
    /// entity that is already a direct child is a no-op; a child parented
    /// elsewhere is detached from its current parent first, which is what
    /// outliner drag-and-drop relies on.
    pub fn add_child(
        &mut self,
        parent: EntityHandle,
        child: EntityHandle,
    ) -> Result<(), EntityError> {
        let parent_id = self.resolve(parent)?;
        let child_id = self.resolve(child)?;
        if self.slots[parent_id as usize]
            .children
            .iter()
            .any(|c| c.index == child_id)
        {
            return Ok(());
        }
        if child_id == parent_id {
            return Err(EntityError::SelfParent);
        }
        // Validate before detaching so a rejected re-parent leaves the
        // child's current link untouched.
        if self.is_ancestor_of(child, parent) {
            return Err(EntityError::WouldCreateCycle);
        }
        if self.slots[child_id as usize].parent.is_some() {
            self.remove_parent(child)?;
        }
        self.set_parent(child, parent)
    }

    /// Detach an entity from its parent. Its local transform becomes its
    /// world transform and it rejoins the root list.
    pub fn remove_parent(&mut self, child: EntityHandle) -> Result<(), EntityError> {
        let child_id = self.resolve(child)?;
        let parent = self.slots[child_id as usize]
            .parent
            .ok_or(EntityError::NotParented)?;

        self.refresh_world(child_id);
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|c| c.index != child_id);
        }
        let child_slot = &mut self.slots[child_id as usize];
        child_slot.local = child_slot.world;
        child_slot.world = child_slot.local.world_from(&Transform::IDENTITY);
        child_slot.world_dirty = false;
        child_slot.parent = None;
        self.insert_root(child_id);
        self.mark_children_dirty(child_id);
        Ok(())
    }

    /// [`remove_parent`](Self::remove_parent) from the parent's side; fails
    /// if `child` is not a direct child of `parent`.
    pub fn detach_child(
        &mut self,
        parent: EntityHandle,
        child: EntityHandle,
    ) -> Result<(), EntityError> {
        let parent_id = self.resolve(parent)?;
        let child_id = self.resolve(child)?;
        let actual = self.slots[child_id as usize].parent;
        if actual.map(|p| p.index) != Some(parent_id) {
            return Err(EntityError::NotAChild);
        }
        self.remove_parent(child)
    }

    fn insert_root(&mut self, id: u32) {
        if let Err(pos) = self.roots.binary_search(&id) {
            self.roots.insert(pos, id);
        }
    }

    fn remove_root(&mut self, id: u32) {
        if let Ok(pos) = self.roots.binary_search(&id) {
            self.roots.remove(pos);
        }
    }

    // ── Transforms ──────────────────────────────────────────────────────

    pub fn local_transform(&self, handle: EntityHandle) -> Option<Transform> {
        self.get(handle).map(|e| e.local)
    }

    pub fn set_local_transform(
        &mut self,
        handle: EntityHandle,
        local: Transform,
        propagate: Propagate,
    ) -> Result<(), EntityError> {
        let id = self.resolve(handle)?;
        self.slots[id as usize].local = local;
        self.after_local_write(id, propagate);
        Ok(())
    }

    pub fn set_local_position(
        &mut self,
        handle: EntityHandle,
        position: Vec3,
        propagate: Propagate,
    ) -> Result<(), EntityError> {
        let id = self.resolve(handle)?;
        self.slots[id as usize].local.position = position;
        self.after_local_write(id, propagate);
        Ok(())
    }

    pub fn set_local_rotation(
        &mut self,
        handle: EntityHandle,
        rotation: Quat,
        propagate: Propagate,
    ) -> Result<(), EntityError> {
        let id = self.resolve(handle)?;
        self.slots[id as usize].local.rotation = rotation;
        self.after_local_write(id, propagate);
        Ok(())
    }

    pub fn set_local_scale(
        &mut self,
        handle: EntityHandle,
        scale: Vec3,
        propagate: Propagate,
    ) -> Result<(), EntityError> {
        let id = self.resolve(handle)?;
        self.slots[id as usize].local.scale = scale;
        self.after_local_write(id, propagate);
        Ok(())
    }

    fn after_local_write(&mut self, id: u32, propagate: Propagate) {
        self.mark_subtree_dirty(id);
        if propagate == Propagate::Immediate {
            self.refresh_world(id);
            let world = self.slots[id as usize].world;
            let types = self.slots[id as usize].components.clone();
            for type_id in types {
                if let Some(pool) = self.pools.get_mut(&type_id) {
                    pool.push_transform(id, &world);
                }
            }
        }
    }

    /// Invalidate every descendant cache after `id`'s own world transform
    /// was rebuilt in place. The descendants' caches were composed against
    /// the old value.
    fn mark_children_dirty(&mut self, id: u32) {
        let children = self.slots[id as usize].children.clone();
        for child in children {
            if let Some(child_id) = self.get(child).map(|e| e.id) {
                self.mark_subtree_dirty(child_id);
            }
        }
    }

    fn mark_subtree_dirty(&mut self, id: u32) {
        self.slots[id as usize].world_dirty = true;
        let children = self.slots[id as usize].children.clone();
        for child in children {
            if let Some(child_id) = self.get(child).map(|e| e.id) {
                self.mark_subtree_dirty(child_id);
            }
        }
    }

    /// The entity's world-space transform, recomputed on demand if any
    /// ancestor's local transform changed since the last propagation pass.
    ///
    /// Agrees bit for bit with the value the per-frame pass would produce:
    /// both paths run the exact same composition per hierarchy level.
    pub fn world_transform(&mut self, handle: EntityHandle) -> Option<Transform> {
        let id = self.get(handle).map(|e| e.id)?;
        self.refresh_world(id);
        Some(self.slots[id as usize].world)
    }

    pub fn world_position(&mut self, handle: EntityHandle) -> Option<Vec3> {
        self.world_transform(handle).map(|t| t.position)
    }

    pub fn world_rotation(&mut self, handle: EntityHandle) -> Option<Quat> {
        self.world_transform(handle).map(|t| t.rotation)
    }

    pub fn world_scale(&mut self, handle: EntityHandle) -> Option<Vec3> {
        self.world_transform(handle).map(|t| t.scale)
    }

    /// Rebuild the cached world transform for `id`, refreshing dirty
    /// ancestors first. No-op when the cache is already clean.
    fn refresh_world(&mut self, id: u32) {
        if !self.slots[id as usize].world_dirty {
            return;
        }
        let parent_world = match self.slots[id as usize].parent {
            Some(parent) => {
                let parent_id = parent.index;
                self.refresh_world(parent_id);
                self.slots[parent_id as usize].world
            }
            None => Transform::IDENTITY,
        };
        let slot = &mut self.slots[id as usize];
        slot.world = slot.local.world_from(&parent_world);
        slot.world_dirty = false;
    }

    /// Depth-first transform propagation over every root. Each entity's
    /// world transform is finalized before its components are notified and
    /// before its children are visited, so a child never reads a stale
    /// parent transform.
    pub fn propagate_transforms(&mut self) {
        let roots = self.roots.clone();
        for id in roots {
            self.propagate_from(id, Transform::IDENTITY);
        }
    }

    fn propagate_from(&mut self, id: u32, parent_world: Transform) {
        let slot = &mut self.slots[id as usize];
        let world = slot.local.world_from(&parent_world);
        slot.world = world;
        slot.world_dirty = false;

        let types = self.slots[id as usize].components.clone();
        for type_id in types {
            if let Some(pool) = self.pools.get_mut(&type_id) {
                pool.push_transform(id, &world);
            }
        }

        let children = self.slots[id as usize].children.clone();
        for child in children {
            if let Some(child_id) = self.get(child).map(|e| e.id) {
                self.propagate_from(child_id, world);
            }
        }
    }

    // ── Components ──────────────────────────────────────────────────────

    /// Create the pool for `T` if it doesn't exist yet. Attach calls require
    /// the type to be registered first.
    pub fn register_component<T: Component>(&mut self) {
        self.pools
            .entry(component_type_id::<T>())
            .or_insert_with(|| Box::new(ComponentPool::<T>::new()));
    }

    pub fn is_component_registered<T: Component>(&self) -> bool {
        self.pools.contains_key(&component_type_id::<T>())
    }

    /// Attach a default-constructed `T` to the entity. The new component is
    /// immediately told the entity's current world transform.
    pub fn attach<T: Component + Default>(
        &mut self,
        handle: EntityHandle,
    ) -> Result<(), EntityError> {
        let id = self.resolve(handle)?;
        let type_id = component_type_id::<T>();
        let Some(pool) = self.pools.get(&type_id) else {
            return Err(EntityError::UnknownComponentType {
                name: short_type_name::<T>(),
            });
        };
        if pool.contains(id) {
            return Err(EntityError::DuplicateComponent {
                name: short_type_name::<T>(),
            });
        }

        self.refresh_world(id);
        let world = self.slots[id as usize].world;

        let pool = self
            .pools
            .get_mut(&type_id)
            .and_then(|p| p.as_any_mut().downcast_mut::<ComponentPool<T>>())
            .ok_or(EntityError::UnknownComponentType {
                name: short_type_name::<T>(),
            })?;
        let mut component = T::default();
        component.transform_updated(&world);
        pool.insert(id, component);

        self.slots[id as usize].components.push(type_id);
        Ok(())
    }

    /// Detach and drop the entity's `T`.
    pub fn detach<T: Component>(&mut self, handle: EntityHandle) -> Result<(), EntityError> {
        let id = self.resolve(handle)?;
        let type_id = component_type_id::<T>();
        let Some(pool) = self.pools.get_mut(&type_id) else {
            return Err(EntityError::UnknownComponentType {
                name: short_type_name::<T>(),
            });
        };
        if !pool.remove(id) {
            return Err(EntityError::MissingComponent {
                name: short_type_name::<T>(),
            });
        }
        self.slots[id as usize].components.retain(|t| *t != type_id);
        Ok(())
    }

    pub fn has_component<T: Component>(&self, handle: EntityHandle) -> bool {
        self.get(handle).is_some_and(|e| {
            self.pools
                .get(&component_type_id::<T>())
                .is_some_and(|p| p.contains(e.id))
        })
    }

    pub fn component<T: Component>(&self, handle: EntityHandle) -> Option<&T> {
        let id = self.get(handle)?.id;
        self.pools
            .get(&component_type_id::<T>())?
            .as_any()
            .downcast_ref::<ComponentPool<T>>()?
            .get(id)
    }

    pub fn component_mut<T: Component>(&mut self, handle: EntityHandle) -> Option<&mut T> {
        let id = self.get(handle)?.id;
        self.pools
            .get_mut(&component_type_id::<T>())?
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()?
            .get_mut(id)
    }

    // ── Frame driver ────────────────────────────────────────────────────

    /// One frame tick: update every component pool, propagate transforms
    /// from the roots, then flush deferred destruction.
    pub fn update(&mut self, dt: f32) {
        for pool in self.pools.values_mut() {
            pool.update_all(dt);
        }
        self.propagate_transforms();
        self.cleanup();
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Quat, Vec3};
    use std::f32::consts::FRAC_PI_2;

    #[derive(Default)]
    struct Probe {
        ticks: u32,
        last_dt: f32,
        seen_world: Transform,
    }

    impl Component for Probe {
        fn update(&mut self, dt: f32) {
            self.ticks += 1;
            self.last_dt = dt;
        }

        fn transform_updated(&mut self, world: &Transform) {
            self.seen_world = *world;
        }
    }

    fn approx(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-4, "expected {b:?}, got {a:?}");
    }

    #[test]
    fn allocate_joins_active_and_roots() {
        let mut mgr = EntityManager::with_capacity(8);
        let a = mgr.allocate().unwrap();
        let b = mgr.allocate().unwrap();
        assert_eq!(mgr.active_entities().len(), 2);
        assert_eq!(mgr.roots().len(), 2);
        assert_ne!(a.index(), b.index());
        assert!(mgr.get(a).unwrap().uid() != mgr.get(b).unwrap().uid());
    }

    #[test]
    fn exhaustion_is_an_error_not_a_crash() {
        let mut mgr = EntityManager::with_capacity(2);
        mgr.allocate().unwrap();
        mgr.allocate().unwrap();
        assert_eq!(
            mgr.allocate(),
            Err(EntityError::ResourceExhausted { capacity: 2 })
        );
    }

    #[test]
    fn child_world_follows_parent() {
        // Root at (5,0,0), child local (1,0,0): child world is (6,0,0).
        let mut mgr = EntityManager::with_capacity(8);
        let r = mgr.allocate().unwrap();
        let c = mgr.allocate().unwrap();
        mgr.add_child(r, c).unwrap();
        mgr.set_local_position(c, Vec3::new(1.0, 0.0, 0.0), Propagate::Deferred)
            .unwrap();
        mgr.set_local_position(r, Vec3::new(5.0, 0.0, 0.0), Propagate::Deferred)
            .unwrap();

        mgr.propagate_transforms();
        approx(
            mgr.get(c).unwrap().world_transform_cached().position,
            Vec3::new(6.0, 0.0, 0.0),
        );
    }

    #[test]
    fn lazy_accessor_agrees_with_propagation_pass() {
        let mut mgr = EntityManager::with_capacity(8);
        let a = mgr.allocate().unwrap();
        let b = mgr.allocate().unwrap();
        let c = mgr.allocate().unwrap();
        mgr.add_child(a, b).unwrap();
        mgr.add_child(b, c).unwrap();

        mgr.set_local_transform(
            a,
            Transform::from_xyz(1.0, 2.0, 3.0).with_rotation(Quat::from_rotation_y(0.4)),
            Propagate::Deferred,
        )
        .unwrap();
        mgr.set_local_transform(
            b,
            Transform::from_xyz(-2.0, 0.5, 0.0).with_scale(2.0),
            Propagate::Deferred,
        )
        .unwrap();
        mgr.set_local_position(c, Vec3::new(0.0, 1.0, 0.0), Propagate::Deferred)
            .unwrap();

        // Lazy path first, while everything is dirty.
        let lazy = mgr.world_transform(c).unwrap();

        // Dirty again, then take the per-frame path.
        mgr.set_local_position(a, Vec3::new(1.0, 2.0, 3.0), Propagate::Deferred)
            .unwrap();
        mgr.propagate_transforms();
        let propagated = mgr.get(c).unwrap().world_transform_cached();

        assert_eq!(lazy.position, propagated.position);
        assert_eq!(lazy.rotation, propagated.rotation);
        assert_eq!(lazy.scale, propagated.scale);
    }

    #[test]
    fn root_list_bijection_under_reparenting() {
        let mut mgr = EntityManager::with_capacity(8);
        let p = mgr.allocate().unwrap();
        let c = mgr.allocate().unwrap();
        assert_eq!(mgr.roots().len(), 2);

        mgr.set_parent(c, p).unwrap();
        let roots = mgr.roots();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0], p);

        mgr.remove_parent(c).unwrap();
        let roots = mgr.roots();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots.iter().filter(|&&h| h == c).count(), 1);
    }

    #[test]
    fn cycle_and_self_parenting_are_rejected_unchanged() {
        let mut mgr = EntityManager::with_capacity(8);
        let a = mgr.allocate().unwrap();
        let b = mgr.allocate().unwrap();
        let c = mgr.allocate().unwrap();
        mgr.add_child(a, b).unwrap();
        mgr.add_child(b, c).unwrap();

        assert_eq!(mgr.set_parent(a, a), Err(EntityError::SelfParent));
        // a is an ancestor of c, so c cannot become a's parent.
        assert_eq!(mgr.set_parent(a, c), Err(EntityError::WouldCreateCycle));
        assert!(!mgr.can_parent(c, a));
        assert!(mgr.is_ancestor_of(a, c));

        // Structure unchanged.
        assert_eq!(mgr.get(a).unwrap().parent(), None);
        assert_eq!(mgr.get(c).unwrap().parent(), Some(b));
        assert_eq!(mgr.roots().len(), 1);
    }

    #[test]
    fn double_parenting_is_rejected() {
        let mut mgr = EntityManager::with_capacity(8);
        let a = mgr.allocate().unwrap();
        let b = mgr.allocate().unwrap();
        let c = mgr.allocate().unwrap();
        mgr.set_parent(c, a).unwrap();
        assert_eq!(mgr.set_parent(c, b), Err(EntityError::AlreadyParented));
        // But re-adding to the same parent is a no-op through add_child.
        assert_eq!(mgr.add_child(a, c), Ok(()));
        assert_eq!(mgr.get(a).unwrap().children().len(), 1);
    }

    #[test]
    fn add_child_reparents_from_another_parent() {
        let mut mgr = EntityManager::with_capacity(8);
        let a = mgr.allocate().unwrap();
        let b = mgr.allocate().unwrap();
        let c = mgr.allocate().unwrap();
        mgr.add_child(a, b).unwrap();
        mgr.set_local_position(a, Vec3::new(4.0, 0.0, 0.0), Propagate::Deferred)
            .unwrap();
        let world_before = mgr.world_transform(b).unwrap();

        // The drop the outliner previews as valid must succeed, even though
        // b already sits under a.
        assert!(mgr.can_parent(c, b));
        mgr.add_child(c, b).unwrap();
        assert_eq!(mgr.get(b).unwrap().parent(), Some(c));
        assert!(mgr.get(a).unwrap().children().is_empty());
        approx(
            mgr.world_transform(b).unwrap().position,
            world_before.position,
        );

        // A rejected re-parent leaves the existing link alone.
        assert_eq!(mgr.add_child(b, c), Err(EntityError::WouldCreateCycle));
        assert_eq!(mgr.get(b).unwrap().parent(), Some(c));
        assert!(mgr.get(c).unwrap().children().contains(&b));
    }

    #[test]
    fn lazy_and_propagated_agree_after_reparenting() {
        let mut mgr = EntityManager::with_capacity(8);
        let p = mgr.allocate().unwrap();
        let c = mgr.allocate().unwrap();
        let gc = mgr.allocate().unwrap();
        mgr.add_child(c, gc).unwrap();
        mgr.set_local_transform(
            p,
            Transform::from_xyz(3.0, -2.0, 1.0)
                .with_rotation(Quat::from_rotation_z(0.7))
                .with_scale(2.0),
            Propagate::Deferred,
        )
        .unwrap();
        mgr.set_local_position(c, Vec3::new(2.0, 3.0, 4.0), Propagate::Deferred)
            .unwrap();
        mgr.set_local_position(gc, Vec3::new(0.0, 1.0, 0.0), Propagate::Deferred)
            .unwrap();

        // Attaching rewrites c's local against p's world; the cached world
        // and the next pass must still agree exactly, descendants included.
        mgr.set_parent(c, p).unwrap();
        let lazy_c = mgr.world_transform(c).unwrap();
        let lazy_gc = mgr.world_transform(gc).unwrap();
        mgr.propagate_transforms();
        assert_eq!(lazy_c, mgr.get(c).unwrap().world_transform_cached());
        assert_eq!(lazy_gc, mgr.get(gc).unwrap().world_transform_cached());

        // Same contract for the detach path.
        mgr.remove_parent(c).unwrap();
        let lazy_c = mgr.world_transform(c).unwrap();
        let lazy_gc = mgr.world_transform(gc).unwrap();
        mgr.propagate_transforms();
        assert_eq!(lazy_c, mgr.get(c).unwrap().world_transform_cached());
        assert_eq!(lazy_gc, mgr.get(gc).unwrap().world_transform_cached());
    }

    #[test]
    fn reparenting_preserves_world_transform() {
        let mut mgr = EntityManager::with_capacity(8);
        let p = mgr.allocate().unwrap();
        let c = mgr.allocate().unwrap();
        mgr.set_local_transform(
            p,
            Transform::from_xyz(5.0, 0.0, 0.0).with_rotation(Quat::from_rotation_y(FRAC_PI_2)),
            Propagate::Deferred,
        )
        .unwrap();
        mgr.set_local_position(c, Vec3::new(2.0, 3.0, 4.0), Propagate::Deferred)
            .unwrap();

        let before = mgr.world_transform(c).unwrap();
        mgr.set_parent(c, p).unwrap();
        let after = mgr.world_transform(c).unwrap();
        approx(after.position, before.position);

        mgr.remove_parent(c).unwrap();
        let detached = mgr.world_transform(c).unwrap();
        approx(detached.position, before.position);
    }

    #[test]
    fn destroy_is_deferred_until_cleanup() {
        let mut mgr = EntityManager::with_capacity(8);
        mgr.register_component::<Probe>();
        let a = mgr.allocate().unwrap();
        let b = mgr.allocate().unwrap();
        mgr.attach::<Probe>(a).unwrap();

        // Destroy mid-iteration over the active list.
        let snapshot: Vec<_> = mgr.active_entities().to_vec();
        for handle in &snapshot {
            if *handle == a {
                mgr.destroy(*handle).unwrap();
            }
        }

        assert!(mgr.is_pending_destroy(a));
        assert_eq!(mgr.active_entities().len(), 2);
        assert!(mgr.has_component::<Probe>(a));
        assert_eq!(mgr.destroy(a), Err(EntityError::AlreadyDestroyed));

        mgr.cleanup();
        assert!(mgr.get(a).is_none());
        assert!(!mgr.has_component::<Probe>(a));
        assert_eq!(mgr.active_entities(), &[b]);
    }

    #[test]
    fn destroying_a_parent_promotes_children_in_place() {
        let mut mgr = EntityManager::with_capacity(8);
        let p = mgr.allocate().unwrap();
        let c1 = mgr.allocate().unwrap();
        let c2 = mgr.allocate().unwrap();
        mgr.set_local_position(p, Vec3::new(10.0, 0.0, 0.0), Propagate::Deferred)
            .unwrap();
        mgr.add_child(p, c1).unwrap();
        mgr.add_child(p, c2).unwrap();
        mgr.set_local_position(c1, Vec3::new(1.0, 0.0, 0.0), Propagate::Deferred)
            .unwrap();
        mgr.set_local_position(c2, Vec3::new(0.0, 2.0, 0.0), Propagate::Deferred)
            .unwrap();

        let w1 = mgr.world_transform(c1).unwrap();
        let w2 = mgr.world_transform(c2).unwrap();

        mgr.destroy(p).unwrap();
        mgr.cleanup();

        let roots = mgr.roots();
        assert_eq!(roots.len(), 2);
        assert!(roots.contains(&c1) && roots.contains(&c2));
        approx(mgr.world_transform(c1).unwrap().position, w1.position);
        approx(mgr.world_transform(c2).unwrap().position, w2.position);
        assert_eq!(mgr.get(c1).unwrap().parent(), None);
    }

    #[test]
    fn recycled_slot_is_clean_and_stale_handles_fail() {
        let mut mgr = EntityManager::with_capacity(2);
        mgr.register_component::<Probe>();
        let p = mgr.allocate().unwrap();
        let c = mgr.allocate().unwrap();
        mgr.add_child(p, c).unwrap();
        mgr.attach::<Probe>(p).unwrap();

        mgr.destroy(p).unwrap();
        mgr.cleanup();

        // Pool of 2 with one live entity: the fresh allocation must reuse
        // the freed slot.
        let fresh = mgr.allocate().unwrap();
        assert_eq!(fresh.index(), p.index());
        assert_ne!(fresh.generation(), p.generation());

        let e = mgr.get(fresh).unwrap();
        assert!(e.children().is_empty());
        assert!(e.parent().is_none());
        assert!(e.component_types().is_empty());
        assert!(!mgr.has_component::<Probe>(fresh));

        // Stale handle: equal by index, but resolution fails.
        assert_eq!(p, fresh);
        assert!(mgr.get(p).is_none());
        assert_eq!(mgr.destroy(p), Err(EntityError::InvalidHandle));
    }

    #[test]
    fn allocation_cursor_wraps() {
        let mut mgr = EntityManager::with_capacity(3);
        let a = mgr.allocate().unwrap();
        let _b = mgr.allocate().unwrap();
        let _c = mgr.allocate().unwrap();
        mgr.destroy(a).unwrap();
        mgr.cleanup();
        // Cursor sits past the end; the only free slot is behind it.
        let d = mgr.allocate().unwrap();
        assert_eq!(d.index(), a.index());
    }

    #[test]
    fn component_attach_detach_errors() {
        let mut mgr = EntityManager::with_capacity(4);
        let e = mgr.allocate().unwrap();

        assert_eq!(
            mgr.attach::<Probe>(e),
            Err(EntityError::UnknownComponentType { name: "Probe" })
        );

        mgr.register_component::<Probe>();
        mgr.attach::<Probe>(e).unwrap();
        assert_eq!(
            mgr.attach::<Probe>(e),
            Err(EntityError::DuplicateComponent { name: "Probe" })
        );

        mgr.detach::<Probe>(e).unwrap();
        assert_eq!(
            mgr.detach::<Probe>(e),
            Err(EntityError::MissingComponent { name: "Probe" })
        );
        assert!(mgr.get(e).unwrap().component_types().is_empty());
    }

    #[test]
    fn attach_seeds_component_with_current_world_transform() {
        let mut mgr = EntityManager::with_capacity(4);
        mgr.register_component::<Probe>();
        let e = mgr.allocate().unwrap();
        mgr.set_local_position(e, Vec3::new(3.0, 0.0, 0.0), Propagate::Deferred)
            .unwrap();
        mgr.attach::<Probe>(e).unwrap();
        approx(
            mgr.component::<Probe>(e).unwrap().seen_world.position,
            Vec3::new(3.0, 0.0, 0.0),
        );
    }

    #[test]
    fn immediate_propagation_notifies_components_without_a_tick() {
        let mut mgr = EntityManager::with_capacity(4);
        mgr.register_component::<Probe>();
        let e = mgr.allocate().unwrap();
        mgr.attach::<Probe>(e).unwrap();

        mgr.set_local_position(e, Vec3::new(7.0, 0.0, 0.0), Propagate::Immediate)
            .unwrap();
        let probe = mgr.component::<Probe>(e).unwrap();
        approx(probe.seen_world.position, Vec3::new(7.0, 0.0, 0.0));
        assert_eq!(probe.ticks, 0);

        // Deferred write leaves the component at its old value until update.
        mgr.set_local_position(e, Vec3::new(8.0, 0.0, 0.0), Propagate::Deferred)
            .unwrap();
        approx(
            mgr.component::<Probe>(e).unwrap().seen_world.position,
            Vec3::new(7.0, 0.0, 0.0),
        );
        mgr.update(0.016);
        let probe = mgr.component::<Probe>(e).unwrap();
        approx(probe.seen_world.position, Vec3::new(8.0, 0.0, 0.0));
        assert_eq!(probe.ticks, 1);
        assert!((probe.last_dt - 0.016).abs() < 1e-6);
    }

    #[test]
    fn update_flushes_pending_destroys() {
        let mut mgr = EntityManager::with_capacity(4);
        let a = mgr.allocate().unwrap();
        mgr.destroy(a).unwrap();
        mgr.update(0.016);
        assert!(mgr.get(a).is_none());
        assert!(mgr.active_entities().is_empty());
        assert!(mgr.roots().is_empty());
    }

    #[test]
    fn detach_child_checks_the_link() {
        let mut mgr = EntityManager::with_capacity(4);
        let a = mgr.allocate().unwrap();
        let b = mgr.allocate().unwrap();
        let c = mgr.allocate().unwrap();
        mgr.add_child(a, b).unwrap();
        assert_eq!(mgr.detach_child(a, c), Err(EntityError::NotAChild));
        assert_eq!(mgr.remove_parent(c), Err(EntityError::NotParented));
        mgr.detach_child(a, b).unwrap();
        assert!(mgr.get(a).unwrap().children().is_empty());
    }
}
