use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::StoreError;
use crate::preferences::{PreferenceDocument, Preferences};

/// Durable per-user preference documents, keyed by user identifier.
#[async_trait]
pub trait PreferenceBackend: Send + Sync {
    async fn find_one(&self, user_id: &str) -> Result<Option<PreferenceDocument>, StoreError>;

    /// Inserts or replaces the user's document and stamps it with the store's clock.
    async fn upsert(
        &self,
        user_id: &str,
        preferences: &Preferences,
    ) -> Result<PreferenceDocument, StoreError>;
}

/// A single JSON file holding the whole `userSettings` collection.
pub struct JsonFileDocumentStore {
    path: PathBuf,
    write_guard: Mutex<()>,
}

impl JsonFileDocumentStore {
    pub const COLLECTION_FILE: &'static str = "userSettings.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_guard: Mutex::new(()),
        }
    }

    async fn read_collection(&self) -> Result<Vec<PreferenceDocument>, StoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_collection(&self, documents: &[PreferenceDocument]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(documents)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceBackend for JsonFileDocumentStore {
    async fn find_one(&self, user_id: &str) -> Result<Option<PreferenceDocument>, StoreError> {
        let documents = self.read_collection().await?;
        Ok(documents.into_iter().find(|doc| doc.user_id == user_id))
    }

    async fn upsert(
        &self,
        user_id: &str,
        preferences: &Preferences,
    ) -> Result<PreferenceDocument, StoreError> {
        let _guard = self.write_guard.lock().await;
        let mut documents = self.read_collection().await?;
        let document = PreferenceDocument::new(user_id, preferences.clone(), Utc::now());

        match documents.iter_mut().find(|doc| doc.user_id == user_id) {
            Some(existing) => *existing = document.clone(),
            None => documents.push(document.clone()),
        }
        self.write_collection(&documents).await?;
        debug!(user_id, path = %self.path.display(), "preference document upserted");
        Ok(document)
    }
}

/// In-process document store. `set_unavailable(true)` makes every call fail.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<String, PreferenceDocument>>,
    unavailable: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("document store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PreferenceBackend for MemoryDocumentStore {
    async fn find_one(&self, user_id: &str) -> Result<Option<PreferenceDocument>, StoreError> {
        self.check_available()?;
        Ok(self.documents.lock().await.get(user_id).cloned())
    }

    async fn upsert(
        &self,
        user_id: &str,
        preferences: &Preferences,
    ) -> Result<PreferenceDocument, StoreError> {
        self.check_available()?;
        let document = PreferenceDocument::new(user_id, preferences.clone(), Utc::now());
        self.documents
            .lock()
            .await
            .insert(user_id.to_string(), document.clone());
        Ok(document)
    }
}
