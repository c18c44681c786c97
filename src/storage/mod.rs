pub mod json_backend;

use std::cell::RefCell;

use crate::errors::StoreError;

pub type Result<T> = std::result::Result<T, StoreError>;

pub use json_backend::JsonStorage;

/// Abstraction over the key-value medium holding the single serialized
/// record. The store is the only writer; swapping this out is how a slower
/// or remote medium would be substituted without changing callers.
pub trait StorageBackend {
    /// Returns the raw serialized record, or `None` when nothing has been
    /// written yet.
    fn read(&self) -> Result<Option<String>>;
    fn write(&self, data: &str) -> Result<()>;
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RefCell<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.data.borrow().clone())
    }

    fn write(&self, data: &str) -> Result<()> {
        *self.data.borrow_mut() = Some(data.to_string());
        Ok(())
    }
}

/// Backend that refuses every write, for exercising quota-exceeded style
/// failure paths.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FailingStorage;

#[cfg(test)]
impl StorageBackend for FailingStorage {
    fn read(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn write(&self, _data: &str) -> Result<()> {
        Err(StoreError::Storage("backing store is full".into()))
    }
}
