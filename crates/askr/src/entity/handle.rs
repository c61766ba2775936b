//! # EntityHandle — Weak References into the Pool
//!
//! An [`EntityHandle`] is just a slot index plus a generation counter — it
//! doesn't own anything. All resolution goes through the
//! [`EntityManager`](super::EntityManager), which returns `None` for handles
//! whose slot has since been recycled.
//!
//! ## Design: Generational Indices
//!
//! Slot indices are recycled aggressively (the pool is fixed-size), so a bare
//! index would silently re-target a stale reference at whatever entity moved
//! into the slot:
//!
//! ```text
//! 1. Allocate entity #5
//! 2. Store a reference: saved = handle(5)
//! 3. Destroy + cleanup entity #5
//! 4. Allocate again — slot #5 is reused
//! 5. Use `saved` — oops, it now refers to the wrong entity!
//! ```
//!
//! The fix: pair the index with a **generation** that the manager bumps each
//! time a slot is returned to the pool. A stale handle still carries the old
//! generation, so lookups fail safely instead of dereferencing the new
//! occupant.
//!
//! ## Equality is index-only
//!
//! Two handles are equal when they name the same *slot*, generation
//! notwithstanding. That is the contract editor code relies on (selection
//! state, drag state) — a handle that went stale mid-gesture still compares
//! equal to a fresh handle for the same slot, and resolution is where
//! staleness is decided. `Hash` matches `Eq`, both implemented manually so
//! they cannot drift apart.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A lightweight, non-owning reference to an entity slot.
///
/// Obtained from [`EntityManager::allocate`](super::EntityManager::allocate);
/// resolved via [`EntityManager::get`](super::EntityManager::get), which
/// yields `None` once the slot has been recycled.
#[derive(Clone, Copy, Eq)]
pub struct EntityHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl EntityHandle {
    /// Sentinel handle that never resolves. Useful for editor state that
    /// needs a "nothing grabbed" value without an `Option`.
    pub const INVALID: Self = Self {
        index: u32::MAX,
        generation: 0,
    };

    /// The raw slot index (0..capacity).
    pub fn index(self) -> u32 {
        self.index
    }

    /// The generation this handle was issued under.
    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Whether this is anything other than the [`INVALID`](Self::INVALID)
    /// sentinel. A `true` here does not mean the handle still resolves —
    /// only the manager knows that.
    pub fn is_valid(self) -> bool {
        self.index != u32::MAX
    }
}

impl PartialEq for EntityHandle {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Hash for EntityHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityHandle({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_ignores_generation() {
        let a = EntityHandle {
            index: 3,
            generation: 0,
        };
        let b = EntityHandle {
            index: 3,
            generation: 7,
        };
        assert_eq!(a, b);
    }

    #[test]
    fn hash_matches_equality() {
        let a = EntityHandle {
            index: 3,
            generation: 0,
        };
        let b = EntityHandle {
            index: 3,
            generation: 7,
        };
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn invalid_sentinel() {
        assert!(!EntityHandle::INVALID.is_valid());
        let real = EntityHandle {
            index: 0,
            generation: 0,
        };
        assert!(real.is_valid());
        assert_ne!(real, EntityHandle::INVALID);
    }
}
