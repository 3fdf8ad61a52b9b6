use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api_connection::endpoints::{GenerateContentRequest, Provider};
use crate::api_connection::ApiConnectionError;
use crate::preferences::Preferences;
use crate::prompt_composer::build_request;

/// One proposed substitute. `score` comes straight from the generator and is not range-checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstituteCandidate {
    pub substitute: String,
    pub score: f64,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergen_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_notes: Option<String>,
}

#[derive(Debug, Error)]
pub enum GenerationErrorKind {
    #[error(transparent)]
    Api(#[from] ApiConnectionError),
    #[error("Gemini response missing or empty.")]
    EmptyResponse,
    #[error("Failed to parse Gemini response as JSON: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// The one failure that ends a search outright: no request can succeed without a key.
#[derive(Debug, Error)]
#[error("Google API key is missing ({0}).")]
pub struct MissingApiKey(pub String);

/// A failure confined to a single ingredient of a search.
#[derive(Debug, Error)]
#[error("Error for ingredient \"{ingredient}\": {kind}")]
pub struct GenerationError {
    pub ingredient: String,
    #[source]
    pub kind: GenerationErrorKind,
}

impl GenerationError {
    fn new(ingredient: &str, kind: impl Into<GenerationErrorKind>) -> Self {
        Self {
            ingredient: ingredient.to_string(),
            kind: kind.into(),
        }
    }
}

/// Anything that can turn a generation request into the model's raw text.
#[async_trait]
pub trait SubstituteGenerator: Send + Sync {
    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, ApiConnectionError>;
}

#[async_trait]
impl SubstituteGenerator for Provider {
    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, ApiConnectionError> {
        let response = self.call_generate_content(request).await?;
        match response.first_text() {
            Some(text) => Ok(text.to_string()),
            None => {
                warn!(
                    finish_reason = response.finish_reason().unwrap_or("none"),
                    "generation returned no text"
                );
                Err(ApiConnectionError::EmptyResponse)
            }
        }
    }
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if !(trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.len() >= 6) {
        return trimmed;
    }
    let inner = &trimmed[3..trimmed.len() - 3];
    inner.strip_prefix("json").unwrap_or(inner).trim()
}

/// Parses generated text into candidates. Blank text and non-array JSON are rejected;
/// an empty array is a valid answer with no substitutes.
pub fn parse_candidates(text: &str) -> Result<Vec<SubstituteCandidate>, GenerationErrorKind> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Err(GenerationErrorKind::EmptyResponse);
    }
    serde_json::from_str(body).map_err(GenerationErrorKind::Malformed)
}

/// Outcome of a multi-ingredient search. Only successful ingredients appear in `results`.
#[derive(Debug, Default)]
pub struct SubstitutionReport {
    /// Successful ingredients in the order they were requested.
    pub order: Vec<String>,
    pub results: HashMap<String, Vec<SubstituteCandidate>>,
    pub failures: Vec<GenerationError>,
}

impl SubstitutionReport {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[SubstituteCandidate])> {
        self.order.iter().filter_map(move |ingredient| {
            self.results
                .get(ingredient)
                .map(|candidates| (ingredient.as_str(), candidates.as_slice()))
        })
    }

    pub fn is_complete_failure(&self) -> bool {
        self.results.is_empty() && !self.failures.is_empty()
    }
}

/// Requests substitutes for a single ingredient.
pub async fn request_substitutes(
    generator: &dyn SubstituteGenerator,
    ingredient: &str,
    preferences: Option<&Preferences>,
) -> Result<Vec<SubstituteCandidate>, GenerationError> {
    let request = build_request(ingredient, preferences);
    let text = generator
        .generate(&request)
        .await
        .map_err(|e| GenerationError::new(ingredient, e))?;
    debug!(ingredient, chars = text.len(), "generated text received");
    parse_candidates(&text).map_err(|kind| GenerationError::new(ingredient, kind))
}

/// Processes ingredients one after another. A failure stays with its ingredient;
/// only a missing API key aborts the whole search.
pub async fn find_substitutes(
    generator: &dyn SubstituteGenerator,
    ingredients: &[String],
    preferences: Option<&Preferences>,
) -> Result<SubstitutionReport, MissingApiKey> {
    let mut report = SubstitutionReport::default();

    for ingredient in ingredients {
        let ingredient = ingredient.trim();
        if ingredient.is_empty() {
            continue;
        }
        info!(ingredient, "finding substitutes");

        match request_substitutes(generator, ingredient, preferences).await {
            Ok(candidates) => {
                if report
                    .results
                    .insert(ingredient.to_string(), candidates)
                    .is_none()
                {
                    report.order.push(ingredient.to_string());
                }
            }
            Err(GenerationError {
                kind: GenerationErrorKind::Api(ApiConnectionError::MissingApiKey(var)),
                ..
            }) => return Err(MissingApiKey(var)),
            Err(e) => {
                warn!(ingredient, error = %e.kind, "substitution request failed");
                report.failures.push(e);
            }
        }
    }

    Ok(report)
}
