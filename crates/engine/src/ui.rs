use std::collections::BTreeMap;

use playbook_core::DraftId;
use serde::{Deserialize, Serialize};

/// Ephemeral editor state. Cached for the session, never part of undo/redo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiState {
    pub active_tab: Option<String>,
    pub selected_draft: Option<DraftId>,
    pub modals: BTreeMap<String, bool>,
}

impl UiState {
    pub fn is_modal_open(&self, name: &str) -> bool {
        self.modals.get(name).copied().unwrap_or(false)
    }

    pub fn set_modal(&mut self, name: &str, open: bool) {
        if open {
            self.modals.insert(name.to_string(), true);
        } else {
            self.modals.remove(name);
        }
    }

    /// Drop the selection if it points at `id`.
    pub fn deselect(&mut self, id: &DraftId) -> bool {
        if self.selected_draft.as_ref() == Some(id) {
            self.selected_draft = None;
            true
        } else {
            false
        }
    }
}
