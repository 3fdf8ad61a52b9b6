//! Persistence seams: a synchronous local key/value store for per-device
//! records and an async document store for per-user preference documents.

pub mod document;
pub mod local;
pub mod memory;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

pub use document::{JsonFileDocumentStore, MemoryDocumentStore, PreferenceBackend};
pub use local::FileStore;
pub use memory::MemoryStore;

/// Fixed key names of the three locally cached records.
pub mod keys {
    pub const ANONYMOUS_ID: &str = "recipe_anonymous_id";
    pub const PREFERENCES: &str = "userPreferences";
    pub const SEARCH_HISTORY: &str = "searchHistory";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A string key/value store with browser local-storage semantics.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Reads a JSON record. Missing, unreadable and corrupt records all come back as `None`.
pub fn read_json<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "local store read failed");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "discarding corrupt local record");
            None
        }
    }
}

pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn LocalStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}
