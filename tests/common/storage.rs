use std::cell::Cell;

use broken_image_stylizer::{MemoryStorage, StorageBackend, StorageError};

/// Storage that throws on every access, like a `localStorage` blocked by
/// privacy settings.
#[derive(Debug, Default)]
pub struct ThrowingStorage {
    pub reads: Cell<usize>,
    pub writes: Cell<usize>,
}

impl StorageBackend for ThrowingStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        self.reads.set(self.reads.get() + 1);
        Err(StorageError::Backend("SecurityError: access denied".to_string()))
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        self.writes.set(self.writes.get() + 1);
        Err(StorageError::Backend("QuotaExceededError".to_string()))
    }
}

/// Storage whose reads fail while writes still land, like a payload that
/// grew past the backend's read limit.
#[derive(Debug, Default)]
pub struct ReadFailingStorage {
    pub inner: MemoryStorage,
}

impl StorageBackend for ReadFailingStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Backend("NotReadableError".to_string()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set_item(key, value)
    }
}
