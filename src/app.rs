use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::api_connection::endpoints::Provider;
use crate::config::AppConfig;
use crate::history::{HistoryCache, HistoryEntry};
use crate::identity::{self, Identity};
use crate::preferences::{PreferenceStore, Preferences};
use crate::ranking::{rank, RankedSubstitutes};
use crate::storage::{FileStore, JsonFileDocumentStore, LocalStore, PreferenceBackend, StoreError};
use crate::substitution::{find_substitutes, GenerationError, MissingApiKey, SubstituteGenerator};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Enter at least one ingredient to substitute.")]
    NoIngredients,
    #[error("Google API key is missing ({0}).")]
    MissingApiKey(String),
}

impl From<MissingApiKey> for SearchError {
    fn from(MissingApiKey(var): MissingApiKey) -> Self {
        SearchError::MissingApiKey(var)
    }
}

/// What one search produced: ranked results for the ingredients that worked,
/// and a scoped error for each one that did not.
#[derive(Debug)]
pub struct SearchOutcome {
    pub ranked: Vec<RankedSubstitutes>,
    pub failures: Vec<GenerationError>,
    pub preferences: Option<Preferences>,
}

/// A user session: identity, preference access, history and the generator.
pub struct SmartSwap {
    identity: Identity,
    preferences: PreferenceStore,
    history: HistoryCache,
    generator: Arc<dyn SubstituteGenerator>,
}

impl SmartSwap {
    pub fn new(
        local: Arc<dyn LocalStore>,
        backend: Arc<dyn PreferenceBackend>,
        generator: Arc<dyn SubstituteGenerator>,
        session_email: Option<&str>,
    ) -> Self {
        let identity = identity::resolve(session_email, local.as_ref());
        let history = HistoryCache::load(local.clone());
        Self {
            identity,
            preferences: PreferenceStore::new(backend, local),
            history,
            generator,
        }
    }

    /// Wires file-backed stores under the data directory and the Gemini provider.
    pub fn open(config: &AppConfig) -> Result<Self, StoreError> {
        let local = Arc::new(FileStore::open(&config.data_dir)?);
        let backend = Arc::new(JsonFileDocumentStore::new(
            config.data_dir.join(JsonFileDocumentStore::COLLECTION_FILE),
        ));
        let provider = Arc::new(Provider::gemini(
            &config.api_key_env_var,
            &config.api_base_url,
            &config.model,
        ));
        Ok(Self::new(
            local,
            backend,
            provider,
            config.user_email.as_deref(),
        ))
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn history(&self) -> &HistoryCache {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub async fn stored_preferences(&self) -> Option<Preferences> {
        self.preferences.stored(&self.identity).await
    }

    pub async fn load_preferences(&self) -> Preferences {
        self.preferences.load(&self.identity).await
    }

    pub async fn save_preferences(
        &self,
        preferences: &Preferences,
    ) -> Result<Option<chrono::DateTime<chrono::Utc>>, StoreError> {
        self.preferences.save(&self.identity, preferences).await
    }

    /// Runs the full pipeline and records every successful ingredient in the history.
    pub async fn search(&mut self, ingredients: &[String]) -> Result<SearchOutcome, SearchError> {
        let ingredients: Vec<String> = ingredients
            .iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect();
        if ingredients.is_empty() {
            return Err(SearchError::NoIngredients);
        }

        let preferences = self.stored_preferences().await;
        let report =
            find_substitutes(self.generator.as_ref(), &ingredients, preferences.as_ref()).await?;

        let mut ranked = Vec::with_capacity(report.results.len());
        for (ingredient, candidates) in report.iter() {
            ranked.push(rank(ingredient, candidates, preferences.as_ref()));
            self.history
                .append(HistoryEntry::from_search(ingredient, candidates.to_vec()));
        }
        info!(
            succeeded = ranked.len(),
            failed = report.failures.len(),
            "search finished"
        );

        Ok(SearchOutcome {
            ranked,
            failures: report.failures,
            preferences,
        })
    }
}
