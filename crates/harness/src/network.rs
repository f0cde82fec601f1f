use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use playbook_core::{Draft, DraftId};
use playbook_engine::{RemoteApi, RemoteError, ServerEntity, SyncIntent};

/// One request as the remote saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub intent: SyncIntent,
    pub draft_id: DraftId,
    pub server_id: Option<String>,
    pub name: Option<String>,
}

/// In-process stand-in for the remote service. Records every request in
/// arrival order and fails on demand.
#[derive(Default)]
pub struct ScriptedRemote {
    calls: Mutex<Vec<RemoteCall>>,
    failures: Mutex<VecDeque<RemoteError>>,
    unreachable: AtomicBool,
    latency: Mutex<Option<Duration>>,
    next_id: AtomicU64,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next request with `error`. Calls stack up in order.
    pub fn fail_next(&self, error: RemoteError) {
        self.failures.lock().push_back(error);
    }

    /// Fail every request until switched back.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Delay every response, to hold requests in flight.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, draft_id: &DraftId) -> Vec<RemoteCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.draft_id == *draft_id)
            .cloned()
            .collect()
    }

    pub fn count(&self, intent: SyncIntent) -> usize {
        self.calls.lock().iter().filter(|c| c.intent == intent).count()
    }

    pub fn intents(&self) -> Vec<SyncIntent> {
        self.calls.lock().iter().map(|c| c.intent).collect()
    }

    pub fn reset(&self) {
        self.calls.lock().clear();
        self.failures.lock().clear();
    }

    async fn handle(&self, intent: SyncIntent, draft: &Draft) -> Result<ServerEntity, RemoteError> {
        self.calls.lock().push(RemoteCall {
            intent,
            draft_id: draft.id.clone(),
            server_id: draft.server_id.clone(),
            name: draft.name().map(str::to_string),
        });

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RemoteError::Unreachable("connection refused".into()));
        }
        let scripted = self.failures.lock().pop_front();
        if let Some(error) = scripted {
            return Err(error);
        }

        let version = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = match (intent, &draft.server_id) {
            (SyncIntent::Create, _) | (_, None) => format!("srv-{version}"),
            (_, Some(existing)) => existing.clone(),
        };
        Ok(ServerEntity { id, version })
    }
}

#[async_trait]
impl RemoteApi for ScriptedRemote {
    async fn create(&self, draft: &Draft) -> Result<ServerEntity, RemoteError> {
        self.handle(SyncIntent::Create, draft).await
    }

    async fn update(&self, draft: &Draft) -> Result<ServerEntity, RemoteError> {
        self.handle(SyncIntent::Update, draft).await
    }

    async fn delete(&self, draft: &Draft) -> Result<ServerEntity, RemoteError> {
        self.handle(SyncIntent::Delete, draft).await
    }
}
