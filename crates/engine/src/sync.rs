//! Moving drafts between the local store and the remote service.
//!
//! Everything here is shared with spawned tasks (auto-save timers, the
//! connectivity watcher), so state lives behind `parking_lot` mutexes that are
//! only ever held for synchronous sections. Lock order when nesting is
//! store, then queue, then persistence.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use playbook_core::{Draft, DraftId, ValidationResult, validate};
use tokio::sync::broadcast;

use crate::autosave::AutoSaveScheduler;
use crate::error::SyncError;
use crate::persist::DraftPersistence;
use crate::queue::{OfflineQueue, SyncIntent};
use crate::remote::{Connectivity, RemoteApi, RemoteError, ServerEntity};
use crate::store::{Acknowledgement, DraftStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Autosave,
    Commit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Acknowledged and the draft is clean.
    Saved(ServerEntity),
    /// Acknowledged, but the draft was edited while the request was in flight.
    Superseded(ServerEntity),
    /// Deferred to the offline queue.
    Queued { intent: SyncIntent },
    /// Nothing to send.
    Clean,
    /// Not sent: the draft fails validation.
    Invalid(ValidationResult),
    /// The draft no longer exists.
    Missing,
    /// A save for this draft is already in flight.
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Missing,
    /// The remote never knew the draft; nothing to send.
    LocalOnly,
    Deleted,
    Queued,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub replayed: usize,
    /// Deletes for drafts the remote never received.
    pub dropped: usize,
    pub remaining: usize,
}

#[derive(Debug, Clone)]
pub enum EngineEvent {
    Saved { draft_id: DraftId, server_id: String },
    SaveFailed { draft_id: DraftId, error: SyncError },
    Queued { draft_id: DraftId, intent: SyncIntent },
    Replayed { draft_id: DraftId, intent: SyncIntent },
    ReplayStalled { draft_id: DraftId, error: SyncError },
}

/// Releases the in-flight slot even if the save future is dropped midway.
struct SaveClaim<'a> {
    autosave: &'a AutoSaveScheduler,
    id: &'a DraftId,
}

impl Drop for SaveClaim<'_> {
    fn drop(&mut self) {
        self.autosave.finish_save(self.id);
    }
}

pub(crate) struct SyncContext {
    pub(crate) store: Mutex<DraftStore>,
    pub(crate) queue: Mutex<OfflineQueue>,
    pub(crate) persistence: Mutex<DraftPersistence>,
    pub(crate) autosave: AutoSaveScheduler,
    remote: Arc<dyn RemoteApi>,
    connectivity: Connectivity,
    events: broadcast::Sender<EngineEvent>,
    drain_lock: tokio::sync::Mutex<()>,
}

impl SyncContext {
    pub(crate) fn new(
        store: DraftStore,
        persistence: DraftPersistence,
        autosave: AutoSaveScheduler,
        remote: Arc<dyn RemoteApi>,
        connectivity: Connectivity,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            store: Mutex::new(store),
            queue: Mutex::new(OfflineQueue::new()),
            persistence: Mutex::new(persistence),
            autosave,
            remote,
            connectivity,
            events,
            drain_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub(crate) fn is_online(&self) -> bool {
        self.connectivity.status().is_online()
    }

    pub(crate) fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Write drafts, UI state and history to local storage.
    pub(crate) fn persist_store(&self) {
        let (dirty, ui, history) = {
            let store = self.store.lock();
            (store.dirty_drafts(), store.ui().clone(), store.persisted_history())
        };
        let mut persistence = self.persistence.lock();
        persistence.save_drafts(&dirty);
        persistence.save_ui(&ui);
        persistence.save_history(&history);
    }

    pub(crate) fn persist_queue(&self) {
        let items = self.queue.lock().to_vec();
        self.persistence.lock().save_queue(&items);
    }

    /// Arm (or re-arm) the auto-save timer for `id`.
    pub(crate) fn schedule_autosave(self: &Arc<Self>, id: &DraftId) -> bool {
        let ctx = Arc::downgrade(self);
        let key = id.clone();
        self.autosave.schedule(id.clone(), async move {
            if let Some(ctx) = ctx.upgrade() {
                ctx.autosave_fire(key).await;
            }
        })
    }

    async fn autosave_fire(self: Arc<Self>, id: DraftId) {
        match self.sync_draft(&id, SyncTrigger::Autosave).await {
            Ok(SyncOutcome::Deferred) => {
                tracing::debug!(draft_id = %id, "save already in flight, re-arming");
                self.schedule_autosave(&id);
            }
            Ok(outcome) => {
                tracing::trace!(draft_id = %id, ?outcome, "auto-save finished");
            }
            Err(err) => {
                let retry = matches!(&err, SyncError::Remote { source, .. } if source.is_transient());
                let dirty = self.store.lock().get(&id).is_some_and(|d| d.dirty);
                if retry && dirty {
                    self.schedule_autosave(&id);
                }
            }
        }
    }

    /// Push the current state of a draft to the remote, or queue it.
    pub(crate) async fn sync_draft(&self, id: &DraftId, trigger: SyncTrigger) -> Result<SyncOutcome, SyncError> {
        if trigger == SyncTrigger::Commit {
            self.autosave.cancel(id);
        }
        if !self.autosave.begin_save(id) {
            return Ok(SyncOutcome::Deferred);
        }
        let _claim = SaveClaim {
            autosave: &self.autosave,
            id,
        };
        self.sync_claimed(id).await
    }

    async fn sync_claimed(&self, id: &DraftId) -> Result<SyncOutcome, SyncError> {
        let (draft, intent, has_queued) = {
            let store = self.store.lock();
            let Some(draft) = store.get(id) else {
                return Ok(SyncOutcome::Missing);
            };
            if !draft.dirty {
                return Ok(SyncOutcome::Clean);
            }
            let validation = draft.validation.clone().unwrap_or_else(|| validate(draft));
            if !validation.is_valid {
                tracing::debug!(draft_id = %id, errors = validation.errors.len(), "draft not valid, not sending");
                return Ok(SyncOutcome::Invalid(validation));
            }
            let queue = self.queue.lock();
            (draft.clone(), queue.intent_for(draft), queue.contains(id))
        };

        if !self.is_online() {
            self.enqueue(draft, intent);
            return Ok(SyncOutcome::Queued { intent });
        }
        if has_queued {
            // Earlier writes for this draft are still waiting; keep them in order.
            self.enqueue(draft, intent);
            if let Err(err) = self.drain().await {
                tracing::debug!(draft_id = %id, error = %err, "drain after enqueue stalled");
            }
            return Ok(SyncOutcome::Queued { intent });
        }

        let sent_version = draft.last_modified;
        tracing::debug!(draft_id = %id, intent = intent.as_str(), "sending draft");
        let result = self.send(intent, &draft).await;

        match result {
            Ok(entity) => Ok(self.apply_ack(&draft, intent, entity, sent_version).await),
            Err(source) if !self.is_online() => {
                tracing::info!(draft_id = %id, error = %source, "went offline during save, queueing");
                self.enqueue(draft, intent);
                Ok(SyncOutcome::Queued { intent })
            }
            Err(source) => {
                let err = SyncError::Remote {
                    draft_id: id.clone(),
                    intent: intent.as_str(),
                    source,
                };
                tracing::warn!(draft_id = %id, error = %err, "save failed");
                self.emit(EngineEvent::SaveFailed {
                    draft_id: id.clone(),
                    error: err.clone(),
                });
                Err(err)
            }
        }
    }

    async fn send(&self, intent: SyncIntent, draft: &Draft) -> Result<ServerEntity, RemoteError> {
        match intent {
            SyncIntent::Create => self.remote.create(draft).await,
            SyncIntent::Update => self.remote.update(draft).await,
            SyncIntent::Delete => self.remote.delete(draft).await,
        }
    }

    async fn apply_ack(
        &self,
        sent: &Draft,
        intent: SyncIntent,
        entity: ServerEntity,
        sent_version: playbook_core::Timestamp,
    ) -> SyncOutcome {
        let id = &sent.id;
        let ack = self.store.lock().acknowledge(id, Some(&entity.id), sent_version);
        match ack {
            Acknowledgement::Missing => {
                tracing::info!(draft_id = %id, "confirmation for a removed draft ignored");
                if intent == SyncIntent::Create {
                    self.discard_orphan(sent, &entity).await;
                }
                SyncOutcome::Missing
            }
            Acknowledgement::Saved => {
                let dropped = self.queue.lock().dequeue(id);
                if dropped > 0 {
                    self.persist_queue();
                }
                self.persist_store();
                tracing::info!(draft_id = %id, server_id = %entity.id, "draft saved");
                self.emit(EngineEvent::Saved {
                    draft_id: id.clone(),
                    server_id: entity.id.clone(),
                });
                SyncOutcome::Saved(entity)
            }
            Acknowledgement::Superseded => {
                self.persist_store();
                tracing::debug!(draft_id = %id, "draft edited while saving, stays dirty");
                SyncOutcome::Superseded(entity)
            }
        }
    }

    /// A create landed for a draft deleted in the meantime. Remove it remotely
    /// so the server does not keep an entity nobody can see.
    async fn discard_orphan(&self, sent: &Draft, entity: &ServerEntity) {
        let mut orphan = sent.clone();
        orphan.server_id = Some(entity.id.clone());
        if let Err(err) = self.remote.delete(&orphan).await {
            tracing::warn!(draft_id = %sent.id, server_id = %entity.id, error = %err, "could not remove orphaned entity");
        }
    }

    fn enqueue(&self, draft: Draft, intent: SyncIntent) {
        let now = self.store.lock().now();
        let draft_id = draft.id.clone();
        let (item, depth) = {
            let mut queue = self.queue.lock();
            let item = queue.enqueue(draft_id.clone(), intent, draft, now);
            (item, queue.len())
        };
        tracing::info!(draft_id = %draft_id, item = %item, intent = intent.as_str(), depth, "queued for replay");
        self.persist_queue();
        self.persist_store();
        self.emit(EngineEvent::Queued { draft_id, intent });
    }

    /// Remove a draft locally and tell the remote, now or later.
    pub(crate) async fn delete(&self, id: &DraftId) -> Result<DeleteOutcome, SyncError> {
        self.autosave.cancel(id);
        let removed = self.store.lock().remove(id);
        let Some(draft) = removed else {
            return Ok(DeleteOutcome::Missing);
        };
        self.persist_store();

        if draft.server_id.is_none() {
            let dropped = self.queue.lock().dequeue(id);
            if dropped > 0 {
                self.persist_queue();
            }
            tracing::debug!(draft_id = %id, dropped, "removed draft the remote never saw");
            return Ok(DeleteOutcome::LocalOnly);
        }

        let has_queued = self.queue.lock().contains(id);
        if !self.is_online() || has_queued {
            self.enqueue(draft, SyncIntent::Delete);
            return Ok(DeleteOutcome::Queued);
        }

        match self.remote.delete(&draft).await {
            Ok(_) => {
                tracing::info!(draft_id = %id, "draft deleted remotely");
                Ok(DeleteOutcome::Deleted)
            }
            Err(source) if !self.is_online() => {
                tracing::info!(draft_id = %id, error = %source, "went offline during delete, queueing");
                self.enqueue(draft, SyncIntent::Delete);
                Ok(DeleteOutcome::Queued)
            }
            Err(source) => {
                let err = SyncError::Remote {
                    draft_id: id.clone(),
                    intent: SyncIntent::Delete.as_str(),
                    source,
                };
                tracing::warn!(draft_id = %id, error = %err, "remote delete failed");
                self.emit(EngineEvent::SaveFailed {
                    draft_id: id.clone(),
                    error: err.clone(),
                });
                Err(err)
            }
        }
    }

    /// Replay the offline queue in order, one item at a time. A failed item
    /// stays at the head and stops the drain.
    pub(crate) async fn drain(&self) -> Result<DrainReport, SyncError> {
        let _guard = self.drain_lock.lock().await;
        let mut created: HashMap<DraftId, String> = HashMap::new();
        let mut report = DrainReport::default();

        loop {
            if !self.is_online() {
                tracing::debug!("offline, drain paused");
                break;
            }
            let head = self.queue.lock().front().cloned();
            let Some(mut item) = head else {
                break;
            };

            let live_server_id = self
                .store
                .lock()
                .get(&item.draft_id)
                .and_then(|d| d.server_id.clone());
            let known = created
                .get(&item.draft_id)
                .cloned()
                .or(live_server_id)
                .or_else(|| item.snapshot.server_id.clone());
            item.snapshot.server_id = known.clone();

            let intent = match (item.intent, known.is_some()) {
                (SyncIntent::Create, true) => SyncIntent::Update,
                (SyncIntent::Update, false) => {
                    tracing::warn!(draft_id = %item.draft_id, "queued update without a server id, sending as create");
                    SyncIntent::Create
                }
                (SyncIntent::Delete, false) => {
                    self.pop_if_head(&item.id);
                    report.dropped += 1;
                    continue;
                }
                (intent, _) => intent,
            };

            match self.send(intent, &item.snapshot).await {
                Ok(entity) => {
                    if intent == SyncIntent::Create {
                        created.insert(item.draft_id.clone(), entity.id.clone());
                    }
                    self.pop_if_head(&item.id);
                    if intent != SyncIntent::Delete {
                        let ack = self.store.lock().acknowledge(
                            &item.draft_id,
                            Some(&entity.id),
                            item.snapshot.last_modified,
                        );
                        if ack == Acknowledgement::Missing && intent == SyncIntent::Create {
                            self.discard_orphan(&item.snapshot, &entity).await;
                        }
                        self.persist_store();
                    }
                    tracing::info!(draft_id = %item.draft_id, intent = intent.as_str(), "replayed");
                    self.emit(EngineEvent::Replayed {
                        draft_id: item.draft_id.clone(),
                        intent,
                    });
                    report.replayed += 1;
                }
                Err(source) => {
                    let err = SyncError::Replay {
                        draft_id: item.draft_id.clone(),
                        intent: intent.as_str(),
                        source,
                    };
                    tracing::warn!(error = %err, remaining = self.queue.lock().len(), "drain stalled");
                    self.emit(EngineEvent::ReplayStalled {
                        draft_id: item.draft_id,
                        error: err.clone(),
                    });
                    return Err(err);
                }
            }
        }

        report.remaining = self.queue.lock().len();
        if report.replayed > 0 || report.dropped > 0 {
            tracing::info!(
                replayed = report.replayed,
                dropped = report.dropped,
                remaining = report.remaining,
                "offline queue drained"
            );
        }
        Ok(report)
    }

    /// Pop the head only if it is still the item that was replayed; a delete
    /// may have purged it in the meantime.
    fn pop_if_head(&self, item: &playbook_core::QueueItemId) {
        let popped = {
            let mut queue = self.queue.lock();
            if queue.front().is_some_and(|head| head.id == *item) {
                queue.pop_front();
                true
            } else {
                false
            }
        };
        if popped {
            self.persist_queue();
        }
    }
}
