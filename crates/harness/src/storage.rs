use playbook_storage::{KvStore, StorageError};

/// A store whose every read and write fails, as when local storage is full
/// or disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingKvStore;

impl FailingKvStore {
    fn error() -> StorageError {
        StorageError::Unavailable("local storage disabled".into())
    }
}

impl KvStore for FailingKvStore {
    fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Err(Self::error())
    }

    fn set(&mut self, _key: &str, _value: &[u8]) -> Result<(), StorageError> {
        Err(Self::error())
    }

    fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
        Err(Self::error())
    }
}
