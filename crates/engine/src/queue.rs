use std::collections::VecDeque;

use playbook_core::{Draft, DraftId, QueueItemId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncIntent {
    Create,
    Update,
    Delete,
}

impl SyncIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncIntent::Create => "create",
            SyncIntent::Update => "update",
            SyncIntent::Delete => "delete",
        }
    }
}

/// A remote write deferred until connectivity returns. `snapshot` is the
/// draft as it was when the write was attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineQueueItem {
    pub id: QueueItemId,
    pub draft_id: DraftId,
    pub intent: SyncIntent,
    pub snapshot: Draft,
    pub enqueued_at: Timestamp,
}

/// FIFO of deferred writes. Items for the same draft are never coalesced.
#[derive(Debug, Default)]
pub struct OfflineQueue {
    items: VecDeque<OfflineQueueItem>,
}

impl OfflineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted items, preserving order.
    pub fn restore(items: Vec<OfflineQueueItem>) -> Self {
        Self {
            items: items.into(),
        }
    }

    pub fn enqueue(&mut self, draft_id: DraftId, intent: SyncIntent, snapshot: Draft, now: Timestamp) -> QueueItemId {
        let id = QueueItemId::new();
        self.items.push_back(OfflineQueueItem {
            id,
            draft_id,
            intent,
            snapshot,
            enqueued_at: now,
        });
        id
    }

    /// Intent for a write of `draft`: update once the remote knows the draft
    /// (server id assigned, or a create is already waiting), create otherwise.
    pub fn intent_for(&self, draft: &Draft) -> SyncIntent {
        if draft.server_id.is_some() || self.has_create_for(&draft.id) {
            SyncIntent::Update
        } else {
            SyncIntent::Create
        }
    }

    /// Remove every item for `draft_id`. Returns how many were dropped.
    pub fn dequeue(&mut self, draft_id: &DraftId) -> usize {
        let before = self.items.len();
        self.items.retain(|item| item.draft_id != *draft_id);
        before - self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn front(&self) -> Option<&OfflineQueueItem> {
        self.items.front()
    }

    pub fn pop_front(&mut self) -> Option<OfflineQueueItem> {
        self.items.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OfflineQueueItem> {
        self.items.iter()
    }

    pub fn contains(&self, draft_id: &DraftId) -> bool {
        self.items.iter().any(|item| item.draft_id == *draft_id)
    }

    pub fn has_create_for(&self, draft_id: &DraftId) -> bool {
        self.items
            .iter()
            .any(|item| item.draft_id == *draft_id && item.intent == SyncIntent::Create)
    }

    pub fn to_vec(&self) -> Vec<OfflineQueueItem> {
        self.items.iter().cloned().collect()
    }
}
