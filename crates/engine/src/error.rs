use playbook_core::{CoreError, DraftId};
use playbook_storage::StorageError;
use thiserror::Error;

use crate::remote::RemoteError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("draft not found: {0}")]
    DraftNotFound(DraftId),

    #[error("no async runtime available; the engine must be constructed inside a tokio runtime")]
    NoRuntime,
}

/// Failure to push a draft to the remote service.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("remote rejected {intent} for {draft_id}: {source}")]
    Remote {
        draft_id: DraftId,
        intent: &'static str,
        #[source]
        source: RemoteError,
    },

    #[error("replay of {intent} for {draft_id} failed: {source}")]
    Replay {
        draft_id: DraftId,
        intent: &'static str,
        #[source]
        source: RemoteError,
    },
}

impl SyncError {
    pub fn draft_id(&self) -> &DraftId {
        match self {
            SyncError::Remote { draft_id, .. } | SyncError::Replay { draft_id, .. } => draft_id,
        }
    }
}
