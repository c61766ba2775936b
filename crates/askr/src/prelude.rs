//! Convenience re-exports — `use askr::prelude::*` for the common items.

pub use crate::entity::{
    Component, Entity, EntityHandle, EntityManager, EntityState, MAX_ENTITIES, Propagate,
};
pub use crate::error::EntityError;
pub use crate::math::{Mat4, Quat, Transform, Vec3};
pub use crate::property::{EntityProperty, PropertyValue};
pub use crate::scene::{SceneData, SceneError, load_scene, save_scene};

#[cfg(feature = "editor")]
pub use crate::editor::{EditorUi, attachment_label, attempt_attach};
