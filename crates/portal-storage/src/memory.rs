//! In-memory storage backend.

use crate::{SecureStorage, StorageResult};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Process-local storage; contents vanish with the value.
#[derive(Default)]
pub struct MemoryStorage {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStorage for MemoryStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.data.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        Ok(self.data.lock().remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();

        storage.set("test_key", "test_value").unwrap();
        assert_eq!(storage.get("test_key").unwrap(), Some("test_value".to_string()));

        assert!(storage.has("test_key").unwrap());
        assert!(!storage.has("nonexistent").unwrap());

        assert!(storage.delete("test_key").unwrap());
        assert!(!storage.delete("test_key").unwrap());
        assert_eq!(storage.get("test_key").unwrap(), None);
    }
}
