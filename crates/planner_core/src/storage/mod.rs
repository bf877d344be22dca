pub mod json_store;
pub mod persister;

use crate::error::AppError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub use json_store::JsonFileBackend;
pub use persister::Persister;

/// Key-value storage holding serialized planner blobs.
///
/// Implementations are called from the persister thread, hence `Send + Sync`.
pub trait StorageBackend: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppError>;
}

/// In-process backend. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(key: &str, value: &str) -> Self {
        let backend = Self::new();
        if let Ok(mut items) = backend.items.lock() {
            items.insert(key.to_string(), value.to_string());
        }
        backend
    }
}

impl StorageBackend for MemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        let items = self
            .items
            .lock()
            .map_err(|_| AppError::io("memory backend lock poisoned"))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| AppError::io("memory backend lock poisoned"))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
