//! # Scene Serialization — Save and Load the Hierarchy
//!
//! A scene file is a flat JSON list of entities: slot id, name, local
//! transform components, and child ids. Entities are written roots-first in
//! depth-first order, so a human diffing the file sees the hierarchy shape.
//!
//! Ids in the file are only meaningful within the file. Loading allocates
//! fresh slots and remaps every reference, so a scene can be instantiated
//! into a manager that already holds entities.
//!
//! Linking happens before local transforms are applied: `set_parent`
//! preserves world transforms by rewriting locals, so applying the captured
//! locals last keeps them exactly as saved.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::{EntityHandle, EntityManager, Propagate};
use crate::error::EntityError;
use crate::math::{Quat, Transform, Vec3};

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("scene parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("entity operation failed: {0}")]
    Entity(#[from] EntityError),

    #[error("scene references unknown entity id {id}")]
    MissingEntity { id: u32 },
}

/// One serialized entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneEntity {
    pub id: u32,
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Direct children, by in-file id.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<u32>,
}

/// A serializable snapshot of a manager's entity hierarchy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneData {
    pub entities: Vec<SceneEntity>,
}

impl SceneData {
    /// Snapshot every active entity, roots first, depth-first.
    pub fn capture(manager: &EntityManager) -> Self {
        let mut entities = Vec::new();
        for root in manager.roots() {
            capture_subtree(manager, root, &mut entities);
        }
        Self { entities }
    }

    /// Allocate and link every entity in the snapshot into `manager`.
    /// Returns the handles of the created roots, in file order.
    pub fn instantiate(
        &self,
        manager: &mut EntityManager,
    ) -> Result<Vec<EntityHandle>, SceneError> {
        let mut remap: HashMap<u32, EntityHandle> = HashMap::new();
        for entry in &self.entities {
            let handle = manager.allocate()?;
            remap.insert(entry.id, handle);
        }

        // Link first, while every transform is still identity.
        for entry in &self.entities {
            let parent = remap[&entry.id];
            for child_id in &entry.children {
                let child = *remap
                    .get(child_id)
                    .ok_or(SceneError::MissingEntity { id: *child_id })?;
                manager.add_child(parent, child)?;
            }
        }

        for entry in &self.entities {
            let handle = remap[&entry.id];
            if let Some(e) = manager.get_mut(handle) {
                e.set_name(entry.name.clone());
            }
            manager.set_local_transform(
                handle,
                Transform {
                    position: entry.position,
                    rotation: entry.rotation,
                    scale: entry.scale,
                },
                Propagate::Deferred,
            )?;
        }

        Ok(self
            .entities
            .iter()
            .filter(|e| !self.entities.iter().any(|p| p.children.contains(&e.id)))
            .map(|e| remap[&e.id])
            .collect())
    }
}

fn capture_subtree(manager: &EntityManager, handle: EntityHandle, out: &mut Vec<SceneEntity>) {
    let Some(entity) = manager.get(handle) else {
        return;
    };
    let local = entity.local_transform();
    out.push(SceneEntity {
        id: entity.id(),
        name: entity.name().to_owned(),
        position: local.position,
        rotation: local.rotation,
        scale: local.scale,
        children: entity.children().iter().map(|c| c.index()).collect(),
    });
    for child in entity.children().to_vec() {
        capture_subtree(manager, child, out);
    }
}

/// Serialize the manager's hierarchy to a pretty-printed JSON file.
pub fn save_scene(path: impl AsRef<Path>, manager: &EntityManager) -> Result<(), SceneError> {
    let path = path.as_ref();
    let scene = SceneData::capture(manager);
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, &scene)?;
    info!(
        "saved scene with {} entities to {}",
        scene.entities.len(),
        path.display()
    );
    Ok(())
}

/// Load a scene file and instantiate it into `manager`. Returns the created
/// root handles.
pub fn load_scene(
    path: impl AsRef<Path>,
    manager: &mut EntityManager,
) -> Result<Vec<EntityHandle>, SceneError> {
    let path = path.as_ref();
    let file = BufReader::new(File::open(path)?);
    let scene: SceneData = serde_json::from_reader(file)?;
    let roots = scene.instantiate(manager)?;
    info!(
        "loaded scene with {} entities from {}",
        scene.entities.len(),
        path.display()
    );
    Ok(roots)
}
