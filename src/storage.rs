// src/storage.rs
//! Key/value blob storage the pass store persists into.

use crate::error::{StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Secure key/value storage for opaque string blobs.
///
/// Implementations must serialize writes to the same key; the pass store
/// relies on that to keep writes in mutation order.
pub trait SecureStorage: Send + Sync {
    /// Reads the blob stored under `key`, or `None` if nothing was ever written.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replaces the blob stored under `key`.
    fn set(&self, key: &str, blob: &str) -> StorageResult<()>;
}

/// Process-local storage. Reads and writes can be made to fail on demand.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// Seeds the storage with an existing blob.
    pub fn with_entry(self, key: &str, blob: &str) -> Self {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), blob.to_string());
        }
        self
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SecureStorage for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("read of {:?} refused", key)));
        }
        let entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, blob: &str) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("write of {:?} refused", key)));
        }
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".to_string()))?;
        entries.insert(key.to_string(), blob.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_key() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("userPasses_v1").unwrap(), None);
    }

    #[test]
    fn test_set_overwrites() {
        let storage = MemoryStorage::new().with_entry("k", "old");
        storage.set("k", "new").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("new"));
        assert_eq!(storage.write_count(), 1);
    }

    #[test]
    fn test_injected_failures() {
        let storage = MemoryStorage::new().with_entry("k", "v");
        storage.set_fail_reads(true);
        storage.set_fail_writes(true);
        assert!(matches!(storage.get("k"), Err(StorageError::Unavailable(_))));
        assert!(matches!(storage.set("k", "x"), Err(StorageError::Unavailable(_))));
        assert_eq!(storage.write_count(), 0);

        storage.set_fail_reads(false);
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
    }
}
