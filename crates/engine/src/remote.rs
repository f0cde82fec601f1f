//! Seams to the outside world: the remote persistence API and the
//! connectivity signal.

use std::sync::Arc;

use async_trait::async_trait;
use playbook_core::Draft;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

/// What the remote service returns once it has stored a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntity {
    pub id: String,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("network unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out")]
    Timeout,

    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl RemoteError {
    /// Worth retrying later. Client-side rejections (4xx) are not.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Unreachable(_) | RemoteError::Timeout => true,
            RemoteError::Rejected { status, .. } => !(400..500).contains(status),
        }
    }
}

/// Remote persistence. `update` and `delete` are assumed idempotent on retry;
/// `create` is not.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn create(&self, draft: &Draft) -> Result<ServerEntity, RemoteError>;

    async fn update(&self, draft: &Draft) -> Result<ServerEntity, RemoteError>;

    async fn delete(&self, draft: &Draft) -> Result<ServerEntity, RemoteError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityStatus {
    Online,
    Offline,
}

impl ConnectivityStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Explicit connectivity input. The host application flips it; the engine
/// watches it to decide between sending and queueing, and to drain the
/// offline queue on reconnect.
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<ConnectivityStatus>>,
}

impl Connectivity {
    pub fn new(initial: ConnectivityStatus) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn online() -> Self {
        Self::new(ConnectivityStatus::Online)
    }

    pub fn offline() -> Self {
        Self::new(ConnectivityStatus::Offline)
    }

    pub fn set(&self, status: ConnectivityStatus) {
        self.tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    pub fn set_online(&self) {
        self.set(ConnectivityStatus::Online);
    }

    pub fn set_offline(&self) {
        self.set(ConnectivityStatus::Offline);
    }

    pub fn status(&self) -> ConnectivityStatus {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectivityStatus> {
        self.tx.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let connectivity = Connectivity::online();
        let mut rx = connectivity.subscribe();

        connectivity.set_offline();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ConnectivityStatus::Offline);

        connectivity.set_online();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_online());
    }

    #[test]
    fn client_rejections_are_not_transient() {
        assert!(RemoteError::Timeout.is_transient());
        assert!(RemoteError::Rejected { status: 503, message: "busy".into() }.is_transient());
        assert!(!RemoteError::Rejected { status: 422, message: "bad".into() }.is_transient());
    }

    #[test]
    fn setting_same_status_does_not_notify() {
        let connectivity = Connectivity::offline();
        let rx = connectivity.subscribe();
        connectivity.set_offline();
        assert!(!rx.has_changed().unwrap());
    }
}
