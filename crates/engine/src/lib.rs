pub mod autosave;
pub mod config;
pub mod error;
pub mod history;
pub mod persist;
pub mod queue;
pub mod remote;
pub mod store;
pub mod sync;
pub mod timer;
pub mod ui;

pub use autosave::{AutoSaveScheduler, SaveState};
pub use config::EngineConfig;
pub use error::{EngineError, SyncError};
pub use history::{HistoryEntry, HistoryManager, PersistedHistory};
pub use persist::DraftPersistence;
pub use queue::{OfflineQueue, OfflineQueueItem, SyncIntent};
pub use remote::{Connectivity, ConnectivityStatus, RemoteApi, RemoteError, ServerEntity};
pub use store::{Acknowledgement, DraftStore};
pub use sync::{DeleteOutcome, DrainReport, EngineEvent, SyncOutcome, SyncTrigger};
pub use timer::DebounceTimers;
pub use ui::UiState;

use std::sync::Arc;

use parking_lot::Mutex;
use playbook_core::{
    Clock, ConflictDetector, Draft, DraftConflict, DraftId, EntityType, GroupId, GroupRoster,
    ParticipantId, Payload, SystemTimeSource, TimeSource, ValidationIssue,
};
use playbook_storage::{KvStore, RecordKeys};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::AbortHandle;

use crate::sync::SyncContext;

/// What `configure()` found in local storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigureReport {
    pub restored_drafts: usize,
    pub restored_queue_items: usize,
    pub history_entries: usize,
    pub pruned_history: usize,
    pub drained: Option<DrainReport>,
}

/// Result of an explicit commit: advisory conflicts plus the sync attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReport {
    pub conflicts: Vec<DraftConflict>,
    pub outcome: SyncOutcome,
}

/// The draft-editing engine. One instance per editing session.
///
/// Mutations are synchronous and take effect immediately; persistence to the
/// remote happens in the background through debounced auto-save, or on
/// demand through [`DraftEngine::commit`]. Must be created inside a tokio
/// runtime.
pub struct DraftEngine {
    ctx: Arc<SyncContext>,
    config: EngineConfig,
    runtime: Handle,
    detector: Mutex<ConflictDetector>,
    watcher: Mutex<Option<AbortHandle>>,
}

impl DraftEngine {
    pub fn new(
        config: EngineConfig,
        remote: Arc<dyn RemoteApi>,
        connectivity: Connectivity,
        storage: Box<dyn KvStore>,
    ) -> Result<Self, EngineError> {
        Self::with_time_source(config, remote, connectivity, storage, Arc::new(SystemTimeSource))
    }

    pub fn with_time_source(
        config: EngineConfig,
        remote: Arc<dyn RemoteApi>,
        connectivity: Connectivity,
        storage: Box<dyn KvStore>,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::InvalidConfig)?;
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;

        let store = DraftStore::new(Clock::new(time), config.max_history_depth);
        let persistence = DraftPersistence::new(storage, RecordKeys::new(config.storage_namespace.clone()));
        let autosave = AutoSaveScheduler::new(runtime.clone(), config.autosave_enabled, config.autosave_debounce);
        let ctx = SyncContext::new(store, persistence, autosave, remote, connectivity);

        tracing::debug!(
            namespace = %config.storage_namespace,
            autosave = config.autosave_enabled,
            debounce_ms = config.autosave_debounce.as_millis() as u64,
            "draft engine created"
        );

        Ok(Self {
            ctx: Arc::new(ctx),
            config,
            runtime,
            detector: Mutex::new(ConflictDetector::new()),
            watcher: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rehydrate from local storage, prune stale history, start watching
    /// connectivity, and resume any outstanding work.
    pub async fn configure(&self) -> ConfigureReport {
        let (drafts, ui, queue_items, history) = {
            let mut persistence = self.ctx.persistence.lock();
            (
                persistence.load_drafts(),
                persistence.load_ui(),
                persistence.load_queue(),
                persistence.load_history(),
            )
        };

        let mut report = ConfigureReport::default();
        let restored: Vec<DraftId> = drafts.iter().map(|d| d.id.clone()).collect();
        {
            let mut store = self.ctx.store.lock();
            report.restored_drafts = store.import_many(drafts);
            if let Some(ui) = ui {
                store.restore_ui(ui);
            }
            let cutoff = store.now().saturating_sub(self.config.history_retention);
            report.pruned_history = store.restore_history(history, cutoff);
            report.history_entries = store.history().undo_depth() + store.history().redo_depth();
        }
        if !queue_items.is_empty() {
            report.restored_queue_items = queue_items.len();
            *self.ctx.queue.lock() = OfflineQueue::restore(queue_items);
        }
        self.ctx.persist_store();
        self.ctx.persist_queue();

        self.start_watcher();

        let queued = !self.ctx.queue.lock().is_empty();
        if queued && self.ctx.is_online() {
            match self.ctx.drain().await {
                Ok(drained) => report.drained = Some(drained),
                Err(err) => tracing::warn!(error = %err, "replay at startup stalled"),
            }
        }

        for id in &restored {
            let needs_save = {
                let store = self.ctx.store.lock();
                let queue = self.ctx.queue.lock();
                store.get(id).is_some_and(|d| d.dirty) && !queue.contains(id)
            };
            if needs_save {
                self.ctx.schedule_autosave(id);
            }
        }

        tracing::info!(
            drafts = report.restored_drafts,
            queued = report.restored_queue_items,
            history = report.history_entries,
            pruned = report.pruned_history,
            "engine configured"
        );
        report
    }

    /// Stop timers and the connectivity watcher, and flush local storage.
    pub fn cleanup(&self) {
        let cancelled = self.ctx.autosave.cancel_all();
        if let Some(handle) = self.watcher.lock().take() {
            handle.abort();
        }
        self.ctx.persist_store();
        self.ctx.persist_queue();
        tracing::debug!(cancelled, "engine cleaned up");
    }

    fn start_watcher(&self) {
        let mut slot = self.watcher.lock();
        if slot.is_some() {
            return;
        }
        let mut rx = self.ctx.connectivity().subscribe();
        // Read before spawning so a flip before the first poll counts as a change.
        let mut was_online = rx.borrow_and_update().is_online();
        let ctx = Arc::downgrade(&self.ctx);
        let handle = self.runtime.spawn(async move {
            while rx.changed().await.is_ok() {
                let online = rx.borrow_and_update().is_online();
                if online != was_online {
                    if online {
                        tracing::info!("connectivity restored");
                    } else {
                        tracing::info!("connectivity lost, saves will be queued");
                    }
                }
                was_online = online;
                if !online {
                    continue;
                }

                // A blip between polls arrives as online -> online.
                let Some(strong) = ctx.upgrade() else {
                    break;
                };
                if strong.queue.lock().is_empty() {
                    continue;
                }
                tracing::info!("draining offline queue");
                if let Err(err) = strong.drain().await {
                    tracing::debug!(error = %err, "drain on reconnect stalled");
                }
            }
        });
        *slot = Some(handle.abort_handle());
    }

    // Mutations

    pub fn create(&self, entity_type: EntityType, initial_payload: Payload) -> DraftId {
        let id = self.ctx.store.lock().create(entity_type, initial_payload);
        self.ctx.persist_store();
        tracing::debug!(draft_id = %id, "draft created");
        id
    }

    pub fn update(&self, id: &DraftId, partial: Payload) -> bool {
        let applied = self.ctx.store.lock().update(id, partial);
        self.after_mutation(id, applied)
    }

    pub fn add_participant(&self, id: &DraftId, participant: ParticipantId) -> bool {
        let applied = self.ctx.store.lock().add_participant(id, participant);
        self.after_mutation(id, applied)
    }

    pub fn remove_participant(&self, id: &DraftId, participant: &ParticipantId) -> bool {
        let applied = self.ctx.store.lock().remove_participant(id, participant);
        self.after_mutation(id, applied)
    }

    pub fn add_group(&self, id: &DraftId, group: GroupId) -> bool {
        let applied = self.ctx.store.lock().add_group(id, group);
        self.after_mutation(id, applied)
    }

    pub fn remove_group(&self, id: &DraftId, group: &GroupId) -> bool {
        let applied = self.ctx.store.lock().remove_group(id, group);
        self.after_mutation(id, applied)
    }

    pub fn undo(&self) -> Option<DraftId> {
        let id = self.ctx.store.lock().undo()?;
        self.after_mutation(&id, true);
        Some(id)
    }

    pub fn redo(&self) -> Option<DraftId> {
        let id = self.ctx.store.lock().redo()?;
        self.after_mutation(&id, true);
        Some(id)
    }

    /// Drop every draft and all history. The offline queue is kept so writes
    /// already owed to the remote still go out.
    pub fn clear_all(&self) {
        self.ctx.autosave.cancel_all();
        self.ctx.store.lock().clear_all();
        self.ctx.persist_store();
    }

    fn after_mutation(&self, id: &DraftId, applied: bool) -> bool {
        if applied {
            self.ctx.persist_store();
            self.ctx.schedule_autosave(id);
        }
        applied
    }

    pub fn select(&self, id: Option<&DraftId>) -> bool {
        let selected = self.ctx.store.lock().select(id);
        if selected {
            self.ctx.persist_store();
        }
        selected
    }

    pub fn set_active_tab(&self, tab: Option<String>) {
        self.ctx.store.lock().set_active_tab(tab);
        self.ctx.persist_store();
    }

    pub fn set_modal(&self, name: &str, open: bool) {
        self.ctx.store.lock().set_modal(name, open);
        self.ctx.persist_store();
    }

    pub fn set_autosave_enabled(&self, enabled: bool) {
        self.ctx.autosave.set_enabled(enabled);
    }

    pub fn set_group_roster(&self, roster: GroupRoster) {
        self.detector.lock().set_roster(roster);
    }

    // Remote

    /// Check for scheduling conflicts, then save immediately. Conflicts are
    /// advisory and never block the save.
    pub async fn commit(&self, id: &DraftId) -> Result<CommitReport, EngineError> {
        let conflicts = self.conflicts_for(id)?;
        for conflict in &conflicts {
            tracing::warn!(
                first = %conflict.first,
                second = %conflict.second,
                date = %conflict.date,
                start_time = %conflict.start_time,
                "scheduling conflict"
            );
        }
        let outcome = self.ctx.sync_draft(id, SyncTrigger::Commit).await?;
        Ok(CommitReport { conflicts, outcome })
    }

    pub async fn delete(&self, id: &DraftId) -> Result<DeleteOutcome, EngineError> {
        Ok(self.ctx.delete(id).await?)
    }

    pub async fn drain_offline_queue(&self) -> Result<DrainReport, EngineError> {
        Ok(self.ctx.drain().await?)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.ctx.subscribe()
    }

    // Selectors

    pub fn draft(&self, id: &DraftId) -> Option<Draft> {
        self.ctx.store.lock().get(id).cloned()
    }

    /// All drafts, ordered by id.
    pub fn drafts(&self) -> Vec<Draft> {
        self.ctx.store.lock().drafts().cloned().collect()
    }

    pub fn drafts_by_type(&self, entity_type: EntityType) -> Vec<Draft> {
        self.ctx.store.lock().drafts_by_type(entity_type).cloned().collect()
    }

    pub fn active_draft(&self) -> Option<Draft> {
        self.ctx.store.lock().active_draft().cloned()
    }

    pub fn validation_errors(&self, id: &DraftId) -> Vec<ValidationIssue> {
        self.ctx.store.lock().validation_errors(id)
    }

    pub fn completeness(&self, id: &DraftId) -> Option<u8> {
        self.ctx.store.lock().completeness(id)
    }

    pub fn can_undo(&self) -> bool {
        self.ctx.store.lock().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.ctx.store.lock().can_redo()
    }

    /// Drafts with a save armed or in flight.
    pub fn pending_saves(&self) -> Vec<DraftId> {
        let mut ids = self.ctx.autosave.pending();
        ids.extend(self.ctx.autosave.saving());
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn save_state(&self, id: &DraftId) -> SaveState {
        self.ctx.autosave.state(id)
    }

    pub fn offline_queue_len(&self) -> usize {
        self.ctx.queue.lock().len()
    }

    pub fn offline_queue(&self) -> Vec<OfflineQueueItem> {
        self.ctx.queue.lock().to_vec()
    }

    pub fn ui_state(&self) -> UiState {
        self.ctx.store.lock().ui().clone()
    }

    /// Every conflicting pair among the current drafts.
    pub fn conflicts(&self) -> Vec<DraftConflict> {
        let store = self.ctx.store.lock();
        self.detector.lock().detect(store.drafts())
    }

    pub fn conflicts_for(&self, id: &DraftId) -> Result<Vec<DraftConflict>, EngineError> {
        let store = self.ctx.store.lock();
        let target = store
            .get(id)
            .ok_or_else(|| EngineError::DraftNotFound(id.clone()))?;
        Ok(self.detector.lock().detect_for(target, store.drafts()))
    }

    pub fn autosave_enabled(&self) -> bool {
        self.ctx.autosave.is_enabled()
    }

    pub fn persistence_degraded(&self) -> bool {
        self.ctx.persistence.lock().is_degraded()
    }

    pub fn connectivity(&self) -> &Connectivity {
        self.ctx.connectivity()
    }
}

impl Drop for DraftEngine {
    fn drop(&mut self) {
        if let Some(handle) = self.watcher.lock().take() {
            handle.abort();
        }
        self.ctx.autosave.cancel_all();
    }
}
