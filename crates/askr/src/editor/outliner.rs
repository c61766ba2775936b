//! World outliner panel: the entity hierarchy as a collapsible tree, with
//! drag-and-drop re-parenting.
//!
//! Dragging a row shows a floating preview label stating what dropping here
//! would do ("Attach coin to platform.", "Cannot attach level to coin.")
//! before the mutation happens. The label is computed from the same
//! [`EntityManager::can_parent`] query the drop handler uses, so the preview
//! can never promise an attach that the manager would then reject.

use egui::{Area, Id, Order, Sense};

use crate::entity::{EntityHandle, EntityManager};
use crate::error::EntityError;

/// What dropping the grabbed entity onto a target would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachAction {
    /// Target is the grabbed entity's current parent; drop detaches.
    Detach,
    /// Drop attaches the grabbed entity under the target.
    Attach,
    /// Drop is rejected (self, cycle, or stale handle).
    Rejected,
}

/// The preview text and verdict for dragging `grabbed` over `target`.
pub fn attachment_label(
    manager: &EntityManager,
    grabbed: EntityHandle,
    target: EntityHandle,
) -> (String, AttachAction) {
    let grabbed_name = display_name(manager, grabbed);
    let target_name = display_name(manager, target);

    if grabbed == target {
        return (
            format!("Cannot attach {grabbed_name} to self."),
            AttachAction::Rejected,
        );
    }
    let current_parent = manager.get(grabbed).and_then(|e| e.parent());
    if current_parent == Some(target) {
        return (
            format!("Detach {grabbed_name} from {target_name}."),
            AttachAction::Detach,
        );
    }
    if manager.can_parent(target, grabbed) {
        (
            format!("Attach {grabbed_name} to {target_name}."),
            AttachAction::Attach,
        )
    } else {
        (
            format!("Cannot attach {grabbed_name} to {target_name}."),
            AttachAction::Rejected,
        )
    }
}

/// Carry out the drop that [`attachment_label`] previewed.
pub fn attempt_attach(
    manager: &mut EntityManager,
    grabbed: EntityHandle,
    target: EntityHandle,
) -> Result<(), EntityError> {
    match attachment_label(manager, grabbed, target).1 {
        AttachAction::Detach => manager.detach_child(target, grabbed),
        AttachAction::Attach => manager.add_child(target, grabbed),
        AttachAction::Rejected => {
            if manager.get(grabbed).is_none() || manager.get(target).is_none() {
                Err(EntityError::InvalidHandle)
            } else if grabbed == target {
                Err(EntityError::SelfParent)
            } else {
                Err(EntityError::WouldCreateCycle)
            }
        }
    }
}

fn display_name(manager: &EntityManager, handle: EntityHandle) -> String {
    match manager.get(handle) {
        Some(e) if !e.name().is_empty() => e.name().to_owned(),
        Some(e) => format!("entity {}", e.id()),
        None => format!("entity {}", handle.index()),
    }
}

/// Outliner panel state: current drag gesture, if any.
#[derive(Default)]
pub struct Outliner {
    grabbed: Option<EntityHandle>,
    hovered: Option<EntityHandle>,
}

impl Outliner {
    /// Draw the panel. Returns the (possibly changed) selection.
    pub fn show(
        &mut self,
        ctx: &egui::Context,
        manager: &mut EntityManager,
        selected: Option<EntityHandle>,
    ) -> Option<EntityHandle> {
        let mut new_selected = selected;

        egui::SidePanel::left("world_outliner")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                ui.heading("World Outliner");
                ui.separator();

                self.hovered = None;
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for root in manager.roots() {
                        self.draw_row(ui, manager, root, &mut new_selected, 0);
                    }
                });
            });

        if let Some(grabbed) = self.grabbed {
            self.draw_drag_preview(ctx, manager, grabbed);

            if ctx.input(|i| i.pointer.any_released()) {
                match self.hovered {
                    Some(target) => {
                        // Invalid drops were already previewed as rejected;
                        // ignore the error and leave the tree unchanged.
                        let _ = attempt_attach(manager, grabbed, target);
                    }
                    // Dropping on empty space detaches to root level.
                    None => {
                        let _ = manager.remove_parent(grabbed);
                    }
                }
                self.grabbed = None;
            }
        }

        new_selected
    }

    fn draw_row(
        &mut self,
        ui: &mut egui::Ui,
        manager: &EntityManager,
        handle: EntityHandle,
        selected: &mut Option<EntityHandle>,
        depth: usize,
    ) {
        let Some(entity) = manager.get(handle) else {
            return;
        };
        let label = format!("{} ({})", display_name(manager, handle), entity.id());
        let children = entity.children().to_vec();

        if children.is_empty() {
            ui.horizontal(|ui| {
                ui.add_space(18.0);
                self.row_label(ui, handle, &label, selected);
            });
        } else {
            let id = ui.make_persistent_id(handle.index());
            egui::collapsing_header::CollapsingState::load_with_default_open(
                ui.ctx(),
                id,
                depth < 2,
            )
            .show_header(ui, |ui| {
                self.row_label(ui, handle, &label, selected);
            })
            .body(|ui| {
                for child in children {
                    self.draw_row(ui, manager, child, selected, depth + 1);
                }
            });
        }
    }

    fn row_label(
        &mut self,
        ui: &mut egui::Ui,
        handle: EntityHandle,
        label: &str,
        selected: &mut Option<EntityHandle>,
    ) {
        let is_selected = *selected == Some(handle);
        let mut response = ui.selectable_label(is_selected, label);
        response = response.interact(Sense::click_and_drag());

        if response.clicked() {
            *selected = Some(handle);
        }
        if response.drag_started() {
            self.grabbed = Some(handle);
            *selected = Some(handle);
        }
        if self.grabbed.is_some() && response.hovered() {
            self.hovered = Some(handle);
        }
    }

    fn draw_drag_preview(
        &self,
        ctx: &egui::Context,
        manager: &EntityManager,
        grabbed: EntityHandle,
    ) {
        let Some(pointer) = ctx.input(|i| i.pointer.hover_pos()) else {
            return;
        };
        let (text, action) = match self.hovered {
            Some(target) => attachment_label(manager, grabbed, target),
            None => (
                format!("Detach {} to root level.", display_name(manager, grabbed)),
                AttachAction::Detach,
            ),
        };

        Area::new(Id::new("outliner_drag_preview"))
            .order(Order::Tooltip)
            .current_pos(pointer + egui::vec2(12.0, 12.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    let color = if action == AttachAction::Rejected {
                        ui.visuals().weak_text_color()
                    } else {
                        ui.visuals().strong_text_color()
                    };
                    ui.colored_label(color, text);
                });
            });
    }
}
