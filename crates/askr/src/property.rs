//! # Property Reflection — Typed Access Without Type Knowledge
//!
//! Editor panels and the scene serializer need to read and write entity
//! fields generically, without a match arm per field at every call site.
//! Rather than a runtime meta-object system with pointer-offset field
//! access, this is a closed set: a [`PropertyValue`] tagged union plus an
//! [`EntityProperty`] descriptor enum, with get/set routed through the
//! manager so every write goes down the same validated path as typed code.
//!
//! Entities inside property values are referred to by slot id, not by
//! handle, since property values are plain serializable data.

use serde::{Deserialize, Serialize};

use crate::entity::{EntityHandle, EntityManager, Propagate};
use crate::error::EntityError;
use crate::math::{Quat, Vec3};

/// A dynamically-typed property value.
///
/// The closed set of types the reflection layer speaks. Serializes with an
/// adjacent type tag so scene files stay self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    Vec3(Vec3),
    Quat(Quat),
    String(String),
    /// A reference to another entity by slot id; `None` means "no entity".
    Entity(Option<u32>),
    EntityList(Vec<u32>),
}

impl PropertyValue {
    /// The tag name, for editor display and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "Bool",
            Self::Int(_) => "Int",
            Self::Float(_) => "Float",
            Self::Vec3(_) => "Vec3",
            Self::Quat(_) => "Quat",
            Self::String(_) => "String",
            Self::Entity(_) => "Entity",
            Self::EntityList(_) => "EntityList",
        }
    }
}

/// The reflectable fields of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityProperty {
    Name,
    Uid,
    Position,
    Rotation,
    Scale,
    Parent,
    Children,
}

impl EntityProperty {
    /// Every property, in inspector display order.
    pub const ALL: [Self; 7] = [
        Self::Name,
        Self::Uid,
        Self::Position,
        Self::Rotation,
        Self::Scale,
        Self::Parent,
        Self::Children,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Uid => "UID",
            Self::Position => "Position",
            Self::Rotation => "Rotation",
            Self::Scale => "Scale",
            Self::Parent => "Parent",
            Self::Children => "Children",
        }
    }

    /// Whether the property accepts writes through the reflection layer.
    /// Identity and hierarchy links are mutated through their own dedicated
    /// calls, never generically.
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::Uid | Self::Parent | Self::Children)
    }
}

impl EntityManager {
    /// Read a property generically. `None` if the handle doesn't resolve.
    pub fn property(&self, handle: EntityHandle, property: EntityProperty) -> Option<PropertyValue> {
        let entity = self.get(handle)?;
        Some(match property {
            EntityProperty::Name => PropertyValue::String(entity.name().to_owned()),
            EntityProperty::Uid => PropertyValue::Int(entity.uid() as i64),
            EntityProperty::Position => PropertyValue::Vec3(entity.local_transform().position),
            EntityProperty::Rotation => PropertyValue::Quat(entity.local_transform().rotation),
            EntityProperty::Scale => PropertyValue::Vec3(entity.local_transform().scale),
            EntityProperty::Parent => PropertyValue::Entity(entity.parent().map(|p| p.index())),
            EntityProperty::Children => {
                PropertyValue::EntityList(entity.children().iter().map(|c| c.index()).collect())
            }
        })
    }

    /// Write a property generically. Transform writes take the deferred
    /// propagation path, same as a typed `set_local_*` call.
    pub fn set_property(
        &mut self,
        handle: EntityHandle,
        property: EntityProperty,
        value: PropertyValue,
    ) -> Result<(), EntityError> {
        if property.is_read_only() {
            return Err(EntityError::ReadOnlyProperty);
        }
        match (property, value) {
            (EntityProperty::Name, PropertyValue::String(name)) => {
                self.get_mut(handle)
                    .ok_or(EntityError::InvalidHandle)?
                    .set_name(name);
                Ok(())
            }
            (EntityProperty::Position, PropertyValue::Vec3(v)) => {
                self.set_local_position(handle, v, Propagate::Deferred)
            }
            (EntityProperty::Rotation, PropertyValue::Quat(q)) => {
                self.set_local_rotation(handle, q, Propagate::Deferred)
            }
            (EntityProperty::Scale, PropertyValue::Vec3(v)) => {
                self.set_local_scale(handle, v, Propagate::Deferred)
            }
            _ => Err(EntityError::PropertyTypeMismatch),
        }
    }
}
