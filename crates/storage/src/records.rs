use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StorageError;
use crate::traits::KvStore;

/// Read a msgpack-encoded record. `Ok(None)` when the key was never written.
pub fn read_record<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        Some(bytes) => Ok(Some(rmp_serde::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

pub fn write_record<T: Serialize>(
    store: &mut dyn KvStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let bytes = rmp_serde::to_vec_named(value)?;
    store.set(key, &bytes)
}
