use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::ranking::best_substitute;
use crate::storage::{self, keys, LocalStore};
use crate::substitution::SubstituteCandidate;

pub const MAX_HISTORY_ENTRIES: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub ingredient: String,
    #[serde(alias = "date")]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_substitute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergen_info: Option<String>,
    #[serde(default)]
    pub substitutes: Vec<SubstituteCandidate>,
}

impl HistoryEntry {
    /// Builds an entry stamped with the current time, deriving the best result from the candidates.
    pub fn from_search(ingredient: &str, substitutes: Vec<SubstituteCandidate>) -> Self {
        let best = best_substitute(&substitutes);
        let best_substitute = best.map(|c| c.substitute.clone());
        let allergen_info = best
            .and_then(|c| c.allergen_info.clone())
            .filter(|info| !info.trim().is_empty());
        Self {
            ingredient: ingredient.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            best_substitute,
            allergen_info,
            substitutes,
        }
    }
}

/// Most-recent-first log of past searches, written through to the local store on every change.
pub struct HistoryCache {
    store: Arc<dyn LocalStore>,
    entries: Vec<HistoryEntry>,
}

impl HistoryCache {
    /// Absent or corrupt data loads as an empty log.
    pub fn load(store: Arc<dyn LocalStore>) -> Self {
        let mut entries: Vec<HistoryEntry> =
            storage::read_json(store.as_ref(), keys::SEARCH_HISTORY).unwrap_or_default();
        entries.truncate(MAX_HISTORY_ENTRIES);
        debug!(count = entries.len(), "search history loaded");
        Self { store, entries }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(MAX_HISTORY_ENTRIES);
        self.persist();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        if let Err(e) = self.store.remove(keys::SEARCH_HISTORY) {
            warn!(error = %e, "failed to clear persisted search history");
        }
    }

    fn persist(&self) {
        if let Err(e) = storage::write_json(self.store.as_ref(), keys::SEARCH_HISTORY, &self.entries) {
            warn!(error = %e, "failed to persist search history");
        }
    }
}
