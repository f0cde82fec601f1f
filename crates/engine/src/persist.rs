//! Durable snapshots of engine state through a `KvStore`.
//!
//! Persistence is best effort. The first storage failure is logged and the
//! adapter drops into memory-only mode for the rest of the session; editing
//! carries on unaffected.

use playbook_core::Draft;
use playbook_storage::{KvStore, RecordKeys, StorageError, read_record, write_record};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::history::PersistedHistory;
use crate::queue::OfflineQueueItem;
use crate::ui::UiState;

pub struct DraftPersistence {
    store: Box<dyn KvStore>,
    keys: RecordKeys,
    degraded: bool,
}

impl DraftPersistence {
    pub fn new(store: Box<dyn KvStore>, keys: RecordKeys) -> Self {
        Self {
            store,
            keys,
            degraded: false,
        }
    }

    /// True once a storage failure has switched the adapter to memory-only.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Only drafts with unsaved changes are kept on disk. With none left the
    /// record is removed.
    pub fn save_drafts<'a>(&mut self, drafts: impl IntoIterator<Item = &'a Draft>) {
        let dirty: Vec<&Draft> = drafts.into_iter().filter(|d| d.dirty).collect();
        let key = self.keys.drafts();
        if dirty.is_empty() {
            self.remove(&key);
        } else {
            self.write(&key, &dirty);
        }
    }

    pub fn save_ui(&mut self, ui: &UiState) {
        let key = self.keys.ui_state();
        self.write(&key, ui);
    }

    pub fn save_queue(&mut self, items: &[OfflineQueueItem]) {
        let key = self.keys.offline_queue();
        if items.is_empty() {
            self.remove(&key);
        } else {
            self.write(&key, &items);
        }
    }

    pub fn save_history(&mut self, history: &PersistedHistory) {
        let key = self.keys.history();
        self.write(&key, history);
    }

    pub fn load_drafts(&mut self) -> Vec<Draft> {
        let key = self.keys.drafts();
        self.read(&key).unwrap_or_default()
    }

    pub fn load_ui(&mut self) -> Option<UiState> {
        let key = self.keys.ui_state();
        self.read(&key)
    }

    pub fn load_queue(&mut self) -> Vec<OfflineQueueItem> {
        let key = self.keys.offline_queue();
        self.read(&key).unwrap_or_default()
    }

    pub fn load_history(&mut self) -> PersistedHistory {
        let key = self.keys.history();
        self.read(&key).unwrap_or_default()
    }

    fn remove(&mut self, key: &str) {
        if self.degraded {
            return;
        }
        if let Err(err) = self.store.remove(key) {
            self.degrade(key, err);
        }
    }

    fn write<T: Serialize>(&mut self, key: &str, value: &T) {
        if self.degraded {
            return;
        }
        if let Err(err) = write_record(self.store.as_mut(), key, value) {
            self.degrade(key, err);
        }
    }

    fn read<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        if self.degraded {
            return None;
        }
        match read_record(self.store.as_ref(), key) {
            Ok(value) => value,
            Err(err) => {
                self.degrade(key, err);
                None
            }
        }
    }

    fn degrade(&mut self, key: &str, err: StorageError) {
        tracing::warn!(key, error = %err, "local storage failed, continuing in memory-only mode");
        self.degraded = true;
    }
}
