//! In-memory artifact store, for embedding and tests

use apiscout_ports::{ArtifactStore, PersistenceError, StoreArea};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
pub struct MemoryArtifactStore {
    files: Mutex<BTreeMap<(StoreArea, String), Vec<u8>>>,
    failing: Mutex<BTreeSet<String>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, area: StoreArea, file_name: &str) -> bool {
        self.files()
            .contains_key(&(area, file_name.to_string()))
    }

    /// Stored content as UTF-8, if present
    pub fn text(&self, area: StoreArea, file_name: &str) -> Option<String> {
        self.files()
            .get(&(area, file_name.to_string()))
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Number of stored files across both areas
    pub fn len(&self) -> usize {
        self.files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every write of `file_name` fail with an I/O error
    pub fn fail_writes_of(&self, file_name: &str) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(file_name.to_string());
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<(StoreArea, String), Vec<u8>>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn write(&self, area: StoreArea, file_name: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(file_name);
        if failing {
            return Err(PersistenceError::Io {
                path: file_name.to_string(),
                message: "simulated write failure".to_string(),
            });
        }
        self.files()
            .insert((area, file_name.to_string()), bytes.to_vec());
        Ok(())
    }

    fn read(&self, area: StoreArea, file_name: &str) -> Result<Vec<u8>, PersistenceError> {
        self.files()
            .get(&(area, file_name.to_string()))
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(file_name.to_string()))
    }

    fn delete(&self, area: StoreArea, file_name: &str) -> Result<(), PersistenceError> {
        self.files()
            .remove(&(area, file_name.to_string()))
            .map(|_| ())
            .ok_or_else(|| PersistenceError::NotFound(file_name.to_string()))
    }
}
