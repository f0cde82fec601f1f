use crate::error::StorageError;

pub const DEFAULT_NAMESPACE: &str = "playbook";

/// Durable key-value substrate. Pure I/O: no knowledge of what is stored.
pub trait KvStore: Send {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// The logical records the engine keeps, each under its own namespaced key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKeys {
    namespace: String,
}

impl RecordKeys {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Snapshots of drafts with unsaved changes.
    pub fn drafts(&self) -> String {
        format!("{}:drafts", self.namespace)
    }

    /// Session-scoped UI state cache.
    pub fn ui_state(&self) -> String {
        format!("{}:ui", self.namespace)
    }

    pub fn offline_queue(&self) -> String {
        format!("{}:offline_queue", self.namespace)
    }

    pub fn history(&self) -> String {
        format!("{}:history", self.namespace)
    }
}

impl Default for RecordKeys {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}
