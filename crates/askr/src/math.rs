//! Math types and glam re-exports.
//!
//! We re-export [glam](https://docs.rs/glam) types so users don't need to
//! depend on it directly. The [`Transform`] type carries position, rotation,
//! and scale, and knows how to convert between parent-relative (local) and
//! absolute (world) space.
//!
//! ## Composition model
//!
//! Transforms compose in scale-rotate-translate order using quaternions
//! directly, *not* by multiplying TRS matrices — the two are not equivalent
//! once non-uniform scale meets rotation, and the scene graph depends on the
//! quaternion form being bit-reproducible between the per-frame propagation
//! pass and the lazy world-transform accessors.

pub use glam::{Mat4, Quat, Vec3};

use serde::{Deserialize, Serialize};

/// A 3D transform: position, rotation, and scale.
///
/// Pure value semantics — no hidden state, no interior mutability. Whether a
/// `Transform` means "local" or "world" depends on where it's stored; the
/// conversion methods below move between the two spaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform (origin, no rotation, uniform scale of 1).
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a transform at the given position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Create a transform at the given position.
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self::from_position(Vec3::new(x, y, z))
    }

    /// Return a copy with the given rotation.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Return a copy with uniform scale applied.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Return a copy with non-uniform scale applied.
    pub fn with_scale_vec(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Express this world-space transform relative to a parent's world-space
    /// transform, yielding the local transform a child would need to end up
    /// exactly here.
    ///
    /// Divides scale component-wise, applies the conjugate rotation, and
    /// translates by the inverse-rotated, inverse-scaled offset. Used when
    /// re-parenting so the child's world position does not jump.
    pub fn relative_to(&self, parent: &Transform) -> Transform {
        let inv_rotation = parent.rotation.conjugate();
        Transform {
            position: (inv_rotation * (self.position - parent.position)) / parent.scale,
            rotation: (inv_rotation * self.rotation).normalize(),
            scale: self.scale / parent.scale,
        }
    }

    /// Treat `self` as a local transform under `parent` (a world-space
    /// transform) and compute the resulting world-space transform.
    ///
    /// Scale is composed component-wise *after* the parent's rotation is
    /// applied to the local scale vector. Rotating a scale vector is
    /// unconventional, but it is the composition the rest of the engine was
    /// built against, so it is load-bearing: do not swap this for a TRS
    /// matrix multiply.
    pub fn world_from(&self, parent: &Transform) -> Transform {
        Transform {
            position: parent.position + parent.rotation * (parent.scale * self.position),
            rotation: (parent.rotation * self.rotation).normalize(),
            scale: parent.scale * (parent.rotation * self.scale),
        }
    }

    /// Compute the 4x4 model matrix (for renderer consumption).
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
