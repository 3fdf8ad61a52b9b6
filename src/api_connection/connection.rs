use dotenv::dotenv;
use reqwest::Client;
use std::env;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::endpoints::{
    GeminiAvailableModel, GenerateContentRequest, GenerateContentResponse, Provider,
    GEMINI_MODELS,
};

#[derive(Debug, Error)]
pub enum ApiConnectionError {
    #[error("API key not found in environment: {0}")]
    MissingApiKey(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("API error {status}: {error_body}")]
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },
    #[error("API returned no generated text")]
    EmptyResponse,
}

impl Provider {
    pub fn gemini(api_key_env_var_name: &str, base_url: &str, model: &str) -> Self {
        dotenv().ok();
        Self::Gemini {
            api_key: api_key_env_var_name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn get_available_models(&self) -> Vec<GeminiAvailableModel> {
        match self {
            Provider::Gemini { .. } => GEMINI_MODELS.to_vec(),
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::Gemini { model, .. } => model,
        }
    }

    /// Resolves the API key without issuing a request.
    pub fn api_key(&self) -> Result<String, ApiConnectionError> {
        match self {
            Provider::Gemini {
                api_key: api_key_env_var_name,
                ..
            } => env::var(api_key_env_var_name)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| ApiConnectionError::MissingApiKey(api_key_env_var_name.clone())),
        }
    }

    pub async fn call_generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ApiConnectionError> {
        match self {
            Provider::Gemini {
                base_url, model, ..
            } => {
                let actual_api_key = self.api_key()?;
                let url = format!("{}/models/{}:generateContent", base_url, model);
                info!(model = %model, "sending generateContent request");

                let client = Client::new();
                let response = client
                    .post(&url)
                    .query(&[("key", actual_api_key.as_str())])
                    .header("Content-Type", "application/json")
                    .json(request)
                    .send()
                    .await?;

                let status = response.status();
                let body = response.text().await?;
                debug!(%status, body_len = body.len(), "generateContent response received");

                if status.is_success() {
                    let parsed = serde_json::from_str::<GenerateContentResponse>(&body)?;
                    if let Some(usage) = &parsed.usage_metadata {
                        debug!(
                            prompt_tokens = usage.prompt_token_count,
                            candidate_tokens = usage.candidates_token_count,
                            total_tokens = usage.total_token_count,
                            "token usage"
                        );
                    }
                    if let Some(error) = &parsed.error {
                        return Err(ApiConnectionError::ApiError {
                            status,
                            error_body: error.message.clone(),
                        });
                    }
                    Ok(parsed)
                } else {
                    warn!(%status, "generateContent request rejected");
                    Err(ApiConnectionError::ApiError {
                        status,
                        error_body: describe_error_body(&body),
                    })
                }
            }
        }
    }
}

/// Pulls the human-readable message out of a Gemini error payload, falling back to the raw body.
fn describe_error_body(body: &str) -> String {
    match serde_json::from_str::<GenerateContentResponse>(body) {
        Ok(GenerateContentResponse {
            error: Some(error), ..
        }) => match error.status.as_deref() {
            Some("PERMISSION_DENIED") => "Invalid API key".to_string(),
            Some("RESOURCE_EXHAUSTED") => "API quota exceeded".to_string(),
            Some("INVALID_ARGUMENT") if error.message.contains("API key") => {
                "Invalid API key".to_string()
            }
            _ => error.message,
        },
        _ if body.trim().is_empty() => "Failed to read error body".to_string(),
        _ => body.to_string(),
    }
}
