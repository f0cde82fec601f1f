use std::sync::Arc;
use std::time::Duration;

use playbook_core::{
    DraftId, EntityType, FieldValue, ManualTimeSource, ParticipantId, Payload,
};
use playbook_engine::{
    ConfigureReport, Connectivity, DraftEngine, EngineConfig, EngineError,
};
use playbook_storage::{KvStore, MemoryKvStore};

use crate::network::ScriptedRemote;

/// Start of the manual clock used by sessions: 2026-03-02T00:00:00Z.
pub const SESSION_EPOCH_MS: u64 = 1_772_409_600_000;

/// An engine wired to a scripted remote, a manual clock and an explicit
/// connectivity switch.
pub struct TestSession {
    pub engine: DraftEngine,
    pub remote: Arc<ScriptedRemote>,
    pub connectivity: Connectivity,
    pub time: ManualTimeSource,
    pub configured: ConfigureReport,
}

impl TestSession {
    /// Online, in-memory storage, default configuration.
    pub async fn start() -> Result<Self, EngineError> {
        Self::builder().start().await
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Create a draft that passes validation: every required field plus one
    /// participant.
    pub fn complete_draft(&self, entity_type: EntityType, name: &str) -> DraftId {
        let id = self.engine.create(entity_type, complete_payload(entity_type, name));
        self.engine.add_participant(&id, ParticipantId::from("player-1"));
        id
    }

    pub fn go_offline(&self) {
        self.connectivity.set_offline();
    }

    pub fn go_online(&self) {
        self.connectivity.set_online();
    }
}

pub struct SessionBuilder {
    config: EngineConfig,
    storage: Option<Box<dyn KvStore>>,
    time: ManualTimeSource,
    online: bool,
    remote: Option<Arc<ScriptedRemote>>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            storage: None,
            time: ManualTimeSource::new(SESSION_EPOCH_MS),
            online: true,
            remote: None,
        }
    }
}

impl SessionBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn storage(mut self, storage: Box<dyn KvStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn time(mut self, time: ManualTimeSource) -> Self {
        self.time = time;
        self
    }

    pub fn offline(mut self) -> Self {
        self.online = false;
        self
    }

    pub fn remote(mut self, remote: Arc<ScriptedRemote>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub async fn start(self) -> Result<TestSession, EngineError> {
        let remote = self.remote.unwrap_or_else(|| Arc::new(ScriptedRemote::new()));
        let connectivity = if self.online {
            Connectivity::online()
        } else {
            Connectivity::offline()
        };
        let storage = self
            .storage
            .unwrap_or_else(|| Box::new(MemoryKvStore::new()) as Box<dyn KvStore>);

        let engine = DraftEngine::with_time_source(
            self.config,
            remote.clone(),
            connectivity.clone(),
            storage,
            Arc::new(self.time.clone()),
        )?;
        let configured = engine.configure().await;

        Ok(TestSession {
            engine,
            remote,
            connectivity,
            time: self.time,
            configured,
        })
    }
}

/// Name, date, start time and one structural entry for `entity_type`.
pub fn complete_payload(entity_type: EntityType, name: &str) -> Payload {
    Payload::new()
        .with("name", name)
        .with("date", "2026-03-14")
        .with("start_time", "09:00")
        .with(
            entity_type.structure_field(),
            FieldValue::List(vec![FieldValue::text("warm-up")]),
        )
}

/// Let spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Sleep on the (paused) runtime clock, then let woken tasks finish.
pub async fn wait(duration: Duration) {
    tokio::time::sleep(duration).await;
    settle().await;
}
