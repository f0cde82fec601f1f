use std::collections::{BTreeMap, HashSet};

use playbook_core::{
    Clock, Draft, DraftId, EntityType, GroupId, ParticipantId, Payload, Timestamp,
    ValidationIssue, ValidationResult, completeness, validate,
};

use crate::history::{HistoryManager, PersistedHistory};
use crate::ui::UiState;

/// Result of applying a remote acknowledgment to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// The draft is gone; the confirmation was stale.
    Missing,
    /// The draft still matched what was sent and is now clean.
    Saved,
    /// The draft was edited after the request went out and stays dirty.
    Superseded,
}

/// Authoritative in-memory map of drafts. Every mutation goes through here.
pub struct DraftStore {
    drafts: BTreeMap<DraftId, Draft>,
    history: HistoryManager,
    ui: UiState,
    clock: Clock,
}

impl DraftStore {
    pub fn new(clock: Clock, max_history_depth: usize) -> Self {
        Self {
            drafts: BTreeMap::new(),
            history: HistoryManager::new(max_history_depth),
            ui: UiState::default(),
            clock,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn create(&mut self, entity_type: EntityType, initial_payload: Payload) -> DraftId {
        let now = self.clock.tick();
        let mut id = DraftId::generate(entity_type, now);
        while self.drafts.contains_key(&id) {
            id = DraftId::generate(entity_type, now);
        }

        let mut draft = Draft::new(id.clone(), entity_type, initial_payload, now);
        draft.validation = Some(validate(&draft));
        self.drafts.insert(id.clone(), draft);
        self.history.clear_redo();
        self.ui.selected_draft = Some(id.clone());
        id
    }

    /// Shallow-merge `partial` into the payload. Unknown ids are ignored.
    pub fn update(&mut self, id: &DraftId, partial: Payload) -> bool {
        self.mutate(id, |draft| draft.payload.merge(partial))
    }

    pub fn add_participant(&mut self, id: &DraftId, participant: ParticipantId) -> bool {
        self.mutate(id, |draft| {
            draft.participants.insert(participant);
        })
    }

    pub fn remove_participant(&mut self, id: &DraftId, participant: &ParticipantId) -> bool {
        self.mutate(id, |draft| {
            draft.participants.remove(participant);
        })
    }

    pub fn add_group(&mut self, id: &DraftId, group: GroupId) -> bool {
        self.mutate(id, |draft| {
            draft.groups.insert(group);
        })
    }

    pub fn remove_group(&mut self, id: &DraftId, group: &GroupId) -> bool {
        self.mutate(id, |draft| {
            draft.groups.remove(group);
        })
    }

    fn mutate(&mut self, id: &DraftId, apply: impl FnOnce(&mut Draft)) -> bool {
        let Some(draft) = self.drafts.get_mut(id) else {
            return false;
        };
        let before = draft.clone();
        apply(draft);
        let now = self.clock.tick();
        draft.last_modified = now;
        draft.dirty = true;
        draft.validation = Some(validate(draft));
        self.history.record(before, now);
        true
    }

    /// Confirmation path: a remote write for this draft was acknowledged.
    pub fn save(&mut self, id: &DraftId) -> bool {
        let now = self.clock.tick();
        match self.drafts.get_mut(id) {
            Some(draft) => {
                draft.dirty = false;
                draft.last_saved_at = Some(now);
                true
            }
            None => false,
        }
    }

    /// Apply a remote acknowledgment for the version of the draft last
    /// modified at `sent_version`.
    pub fn acknowledge(
        &mut self,
        id: &DraftId,
        server_id: Option<&str>,
        sent_version: Timestamp,
    ) -> Acknowledgement {
        let Some(draft) = self.drafts.get_mut(id) else {
            return Acknowledgement::Missing;
        };
        if let Some(server_id) = server_id {
            draft.server_id = Some(server_id.to_string());
        }
        if draft.last_modified == sent_version {
            self.save(id);
            Acknowledgement::Saved
        } else {
            Acknowledgement::Superseded
        }
    }

    pub fn remove(&mut self, id: &DraftId) -> Option<Draft> {
        let removed = self.drafts.remove(id)?;
        self.ui.deselect(id);
        self.history.forget(id);
        Some(removed)
    }

    /// Bulk insert, used for rehydration. Existing drafts with the same id are
    /// replaced. Validation is recomputed.
    pub fn import_many(&mut self, drafts: impl IntoIterator<Item = Draft>) -> usize {
        let mut count = 0;
        for mut draft in drafts {
            self.clock.observe(draft.last_modified);
            draft.validation = Some(validate(&draft));
            self.drafts.insert(draft.id.clone(), draft);
            count += 1;
        }
        count
    }

    pub fn clear_all(&mut self) {
        self.drafts.clear();
        self.history.clear();
        self.ui.selected_draft = None;
    }

    pub fn undo(&mut self) -> Option<DraftId> {
        let now = self.clock.tick();
        let snapshot = self.history.undo(&self.drafts, now)?;
        Some(self.restore_snapshot(snapshot, now))
    }

    pub fn redo(&mut self) -> Option<DraftId> {
        let now = self.clock.tick();
        let snapshot = self.history.redo(&self.drafts, now)?;
        Some(self.restore_snapshot(snapshot, now))
    }

    /// Overwrite a draft's content with a historical snapshot. Server
    /// bookkeeping stays with the live draft so an undo never forgets that
    /// the remote already knows the entity.
    fn restore_snapshot(&mut self, snapshot: Draft, now: Timestamp) -> DraftId {
        let id = snapshot.id.clone();
        let mut restored = snapshot;
        if let Some(live) = self.drafts.get(&id) {
            restored.server_id = live.server_id.clone();
            restored.last_saved_at = live.last_saved_at;
            restored.created_at = live.created_at;
        }
        restored.last_modified = now;
        restored.dirty = true;
        restored.validation = Some(validate(&restored));
        self.drafts.insert(id.clone(), restored);
        id
    }

    pub fn get(&self, id: &DraftId) -> Option<&Draft> {
        self.drafts.get(id)
    }

    pub fn contains(&self, id: &DraftId) -> bool {
        self.drafts.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    pub fn drafts(&self) -> impl Iterator<Item = &Draft> {
        self.drafts.values()
    }

    pub fn drafts_by_type(&self, entity_type: EntityType) -> impl Iterator<Item = &Draft> {
        self.drafts
            .values()
            .filter(move |d| d.entity_type == entity_type)
    }

    pub fn dirty_drafts(&self) -> Vec<Draft> {
        self.drafts.values().filter(|d| d.dirty).cloned().collect()
    }

    pub fn draft_ids(&self) -> HashSet<DraftId> {
        self.drafts.keys().cloned().collect()
    }

    pub fn active_draft(&self) -> Option<&Draft> {
        self.ui
            .selected_draft
            .as_ref()
            .and_then(|id| self.drafts.get(id))
    }

    pub fn validation(&self, id: &DraftId) -> Option<&ValidationResult> {
        self.drafts.get(id).and_then(|d| d.validation.as_ref())
    }

    pub fn validation_errors(&self, id: &DraftId) -> Vec<ValidationIssue> {
        self.validation(id)
            .map(|v| v.errors.clone())
            .unwrap_or_default()
    }

    pub fn completeness(&self, id: &DraftId) -> Option<u8> {
        self.drafts.get(id).map(completeness)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn persisted_history(&self) -> PersistedHistory {
        self.history.to_persisted()
    }

    /// Load a previously persisted history, prune it to the retention window
    /// and to drafts that exist. Returns the number of entries dropped.
    pub fn restore_history(&mut self, persisted: PersistedHistory, cutoff: Timestamp) -> usize {
        self.history.restore(persisted);
        let live = self.draft_ids();
        self.history.prune_older_than(cutoff) + self.history.retain_drafts(&live)
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn set_active_tab(&mut self, tab: Option<String>) {
        self.ui.active_tab = tab;
    }

    pub fn select(&mut self, id: Option<&DraftId>) -> bool {
        match id {
            Some(id) if !self.drafts.contains_key(id) => false,
            _ => {
                self.ui.selected_draft = id.cloned();
                true
            }
        }
    }

    pub fn set_modal(&mut self, name: &str, open: bool) {
        self.ui.set_modal(name, open);
    }

    /// Replace UI state from the session cache, dropping a stale selection.
    pub fn restore_ui(&mut self, mut ui: UiState) {
        if let Some(id) = &ui.selected_draft
            && !self.drafts.contains_key(id)
        {
            ui.selected_draft = None;
        }
        self.ui = ui;
    }
}
