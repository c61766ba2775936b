//! Inspector panel: every reflectable property of the selected entity,
//! rendered generically from [`EntityProperty::ALL`].
//!
//! Edits go through [`EntityManager::set_property`], so the panel gets the
//! same validation as typed code and needs no per-field plumbing.

use crate::entity::{EntityHandle, EntityManager};
use crate::math::{Quat, Vec3};
use crate::property::{EntityProperty, PropertyValue};

/// Draw the inspector for the selected entity.
pub fn inspector_panel(
    ctx: &egui::Context,
    manager: &mut EntityManager,
    selected: Option<EntityHandle>,
) {
    egui::SidePanel::right("inspector")
        .default_width(280.0)
        .resizable(true)
        .show(ctx, |ui| {
            ui.heading("Inspector");
            ui.separator();

            let Some(handle) = selected else {
                ui.label("No entity selected");
                return;
            };
            if manager.get(handle).is_none() {
                ui.label("Selected entity no longer exists");
                return;
            }

            for property in EntityProperty::ALL {
                let Some(value) = manager.property(handle, property) else {
                    continue;
                };
                if let Some(new_value) = property_row(ui, property, value) {
                    if let Err(err) = manager.set_property(handle, property, new_value) {
                        log::warn!("inspector edit rejected: {err}");
                    }
                }
            }

            ui.separator();
            if let Some(entity) = manager.get(handle) {
                ui.label(format!(
                    "{} component(s) attached",
                    entity.component_types().len()
                ));
            }
        });
}

/// Draw one property row. Returns the new value if the user edited it.
fn property_row(
    ui: &mut egui::Ui,
    property: EntityProperty,
    value: PropertyValue,
) -> Option<PropertyValue> {
    match value {
        PropertyValue::String(mut s) => {
            let changed = ui
                .horizontal(|ui| {
                    ui.label(property.display_name());
                    ui.text_edit_singleline(&mut s).changed()
                })
                .inner;
            (changed && !property.is_read_only()).then_some(PropertyValue::String(s))
        }
        PropertyValue::Vec3(mut v) => {
            let changed = vec3_row(ui, property.display_name(), &mut v);
            (changed && !property.is_read_only()).then_some(PropertyValue::Vec3(v))
        }
        PropertyValue::Quat(q) => quat_row(ui, property.display_name(), q)
            .filter(|_| !property.is_read_only())
            .map(PropertyValue::Quat),
        PropertyValue::Int(i) => {
            ui.horizontal(|ui| {
                ui.label(property.display_name());
                ui.label(i.to_string());
            });
            None
        }
        PropertyValue::Entity(parent) => {
            ui.horizontal(|ui| {
                ui.label(property.display_name());
                match parent {
                    Some(id) => ui.label(format!("entity {id}")),
                    None => ui.label("(none)"),
                };
            });
            None
        }
        PropertyValue::EntityList(ids) => {
            ui.horizontal(|ui| {
                ui.label(property.display_name());
                ui.label(format!("{} children", ids.len()));
            });
            None
        }
        PropertyValue::Bool(_) | PropertyValue::Float(_) => None,
    }
}

fn vec3_row(ui: &mut egui::Ui, label: &str, v: &mut Vec3) -> bool {
    ui.label(label);
    ui.horizontal(|ui| {
        let mut changed = false;
        changed |= ui
            .add(egui::DragValue::new(&mut v.x).speed(0.1).prefix("X: "))
            .changed();
        changed |= ui
            .add(egui::DragValue::new(&mut v.y).speed(0.1).prefix("Y: "))
            .changed();
        changed |= ui
            .add(egui::DragValue::new(&mut v.z).speed(0.1).prefix("Z: "))
            .changed();
        changed
    })
    .inner
}

/// Rotation is edited as yaw/pitch/roll degrees and converted back to a
/// quaternion only when a drag actually changes a value.
fn quat_row(ui: &mut egui::Ui, label: &str, q: Quat) -> Option<Quat> {
    let (mut yaw, mut pitch, mut roll) = q.to_euler(glam::EulerRot::YXZ);
    yaw = yaw.to_degrees();
    pitch = pitch.to_degrees();
    roll = roll.to_degrees();

    ui.label(format!("{label} (deg)"));
    let changed = ui
        .horizontal(|ui| {
            let mut changed = false;
            changed |= ui
                .add(egui::DragValue::new(&mut yaw).speed(0.5).prefix("Y: "))
                .changed();
            changed |= ui
                .add(egui::DragValue::new(&mut pitch).speed(0.5).prefix("X: "))
                .changed();
            changed |= ui
                .add(egui::DragValue::new(&mut roll).speed(0.5).prefix("Z: "))
                .changed();
            changed
        })
        .inner;

    changed.then(|| {
        Quat::from_euler(
            glam::EulerRot::YXZ,
            yaw.to_radians(),
            pitch.to_radians(),
            roll.to_radians(),
        )
    })
}
