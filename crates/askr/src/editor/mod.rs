//! Editor panels built on egui: a world outliner with drag-and-drop
//! re-parenting and a generic property inspector.
//!
//! Feature-gated behind `editor`. The panels are pure clients of the
//! [`EntityManager`](crate::entity::EntityManager) public API; windowing and
//! rendering integration is the host application's concern, which is why
//! everything here takes an `egui::Context` rather than owning one.

mod inspector;
mod outliner;

pub use outliner::{AttachAction, Outliner, attachment_label, attempt_attach};

use crate::entity::{EntityHandle, EntityManager};

/// Combined editor UI state: outliner drag state plus the shared selection.
#[derive(Default)]
pub struct EditorUi {
    pub selected: Option<EntityHandle>,
    outliner: Outliner,
}

impl EditorUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw both panels for this frame.
    pub fn show(&mut self, ctx: &egui::Context, manager: &mut EntityManager) {
        self.selected = self.outliner.show(ctx, manager, self.selected);
        // Drop the selection if the entity was destroyed this frame.
        if let Some(handle) = self.selected {
            if manager.get(handle).is_none() {
                self.selected = None;
            }
        }
        inspector::inspector_panel(ctx, manager, self.selected);
    }
}
