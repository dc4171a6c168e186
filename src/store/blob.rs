use alloc::{collections::BTreeMap, string::String, vec::Vec};

use crate::error::ManagerError;

/// Namespaced key-value blob service. `set` replaces the whole value atomically:
/// a reader sees either the previous blob or the new one.
pub trait BlobStore {
    /// `Ok(None)` when the namespace or key has never been written.
    fn get(&mut self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, ManagerError>;

    fn set(&mut self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), ManagerError>;
}

impl<T: BlobStore + ?Sized> BlobStore for &mut T {
    fn get(&mut self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, ManagerError> {
        (**self).get(namespace, key)
    }

    fn set(&mut self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), ManagerError> {
        (**self).set(namespace, key, bytes)
    }
}

/// RAM-backed store for hosts without flash. Faults can be injected to exercise
/// the storage error paths.
#[derive(Default, Debug)]
pub struct MemoryBlobStore {
    entries: BTreeMap<(String, String), Vec<u8>>,
    read_fault: bool,
    write_fault: bool,
    writes: usize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_read_fault(&mut self, fault: bool) {
        self.read_fault = fault;
    }

    pub fn set_write_fault(&mut self, fault: bool) {
        self.write_fault = fault;
    }

    /// Number of committed writes.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Stores raw bytes without going through the record codec.
    pub fn insert_raw(&mut self, namespace: &str, key: &str, bytes: &[u8]) {
        self.entries
            .insert((namespace.into(), key.into()), bytes.to_vec());
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&mut self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, ManagerError> {
        if self.read_fault {
            return Err(ManagerError::StorageUnavailable);
        }
        Ok(self
            .entries
            .get(&(String::from(namespace), String::from(key)))
            .cloned())
    }

    fn set(&mut self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), ManagerError> {
        if self.write_fault {
            return Err(ManagerError::StorageUnavailable);
        }
        let mut value = Vec::new();
        value.try_reserve_exact(bytes.len())?;
        value.extend_from_slice(bytes);
        self.entries.insert((namespace.into(), key.into()), value);
        self.writes += 1;
        Ok(())
    }
}
