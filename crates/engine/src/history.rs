use std::collections::{BTreeMap, HashSet, VecDeque};

use playbook_core::{Draft, DraftId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub draft_id: DraftId,
    pub snapshot: Draft,
    pub timestamp: Timestamp,
}

/// On-disk form of the history. Only the live part of `past` is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedHistory {
    pub past: Vec<HistoryEntry>,
    pub future: Vec<HistoryEntry>,
}

/// Linear undo/redo over draft snapshots.
///
/// Entries are tagged with the draft they belong to, but `past` and the
/// cursor are global: undo walks back through whichever draft was edited most
/// recently, across all open drafts.
pub struct HistoryManager {
    past: Vec<HistoryEntry>,
    /// Front is the most recently undone state.
    future: VecDeque<HistoryEntry>,
    cursor: usize,
    max_depth: usize,
}

impl HistoryManager {
    pub fn new(max_depth: usize) -> Self {
        Self {
            past: Vec::new(),
            future: VecDeque::new(),
            cursor: 0,
            max_depth: max_depth.max(1),
        }
    }

    /// Record the pre-mutation state of a draft. Invalidates redo.
    pub fn record(&mut self, snapshot: Draft, timestamp: Timestamp) {
        self.past.truncate(self.cursor);
        self.past.push(HistoryEntry {
            draft_id: snapshot.id.clone(),
            snapshot,
            timestamp,
        });
        self.cursor += 1;
        self.future.clear();

        // Enforce depth limit by dropping oldest entry
        if self.cursor > self.max_depth {
            self.past.remove(0);
            self.cursor -= 1;
        }
    }

    /// Invalidate redo without recording anything (e.g. a new draft was created).
    pub fn clear_redo(&mut self) {
        self.future.clear();
    }

    /// Step back one entry. Returns the snapshot to restore; the caller's
    /// current state for that draft is pushed onto `future`.
    pub fn undo(&mut self, drafts: &BTreeMap<DraftId, Draft>, timestamp: Timestamp) -> Option<Draft> {
        while self.cursor > 0 {
            self.cursor -= 1;
            let entry = self.past[self.cursor].clone();
            let Some(current) = drafts.get(&entry.draft_id) else {
                // Draft vanished without being forgotten; drop its entry.
                self.past.remove(self.cursor);
                continue;
            };
            self.future.push_front(HistoryEntry {
                draft_id: entry.draft_id,
                snapshot: current.clone(),
                timestamp,
            });
            return Some(entry.snapshot);
        }
        None
    }

    /// Re-apply the most recently undone state.
    pub fn redo(&mut self, drafts: &BTreeMap<DraftId, Draft>, timestamp: Timestamp) -> Option<Draft> {
        while let Some(entry) = self.future.pop_front() {
            let Some(current) = drafts.get(&entry.draft_id) else {
                continue;
            };
            self.past.truncate(self.cursor);
            self.past.push(HistoryEntry {
                draft_id: entry.draft_id,
                snapshot: current.clone(),
                timestamp,
            });
            self.cursor += 1;
            return Some(entry.snapshot);
        }
        None
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.cursor
    }

    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }

    /// Drop every entry tagged with `draft_id`.
    pub fn forget(&mut self, draft_id: &DraftId) -> usize {
        let before_cursor = self.past[..self.cursor]
            .iter()
            .filter(|e| e.draft_id == *draft_id)
            .count();
        let before = self.past.len() + self.future.len();
        self.past.retain(|e| e.draft_id != *draft_id);
        self.future.retain(|e| e.draft_id != *draft_id);
        self.cursor -= before_cursor;
        before - (self.past.len() + self.future.len())
    }

    /// Drop entries recorded before `cutoff`. Returns how many were dropped.
    pub fn prune_older_than(&mut self, cutoff: Timestamp) -> usize {
        let before_cursor = self.past[..self.cursor]
            .iter()
            .filter(|e| e.timestamp < cutoff)
            .count();
        let before = self.past.len() + self.future.len();
        self.past.retain(|e| e.timestamp >= cutoff);
        self.future.retain(|e| e.timestamp >= cutoff);
        self.cursor -= before_cursor;
        before - (self.past.len() + self.future.len())
    }

    /// Keep only entries whose draft is in `live`.
    pub fn retain_drafts(&mut self, live: &HashSet<DraftId>) -> usize {
        let stale: HashSet<DraftId> = self
            .past
            .iter()
            .chain(self.future.iter())
            .filter(|e| !live.contains(&e.draft_id))
            .map(|e| e.draft_id.clone())
            .collect();
        stale.iter().map(|id| self.forget(id)).sum()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.cursor = 0;
    }

    pub fn to_persisted(&self) -> PersistedHistory {
        PersistedHistory {
            past: self.past[..self.cursor].to_vec(),
            future: self.future.iter().cloned().collect(),
        }
    }

    pub fn restore(&mut self, persisted: PersistedHistory) {
        let mut past = persisted.past;
        if past.len() > self.max_depth {
            past.drain(..past.len() - self.max_depth);
        }
        self.cursor = past.len();
        self.past = past;
        self.future = persisted.future.into();
    }
}
