use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

use crate::api_connection::endpoints::{DEFAULT_BASE_URL, DEFAULT_MODEL, GEMINI_MODELS};

pub const DEFAULT_API_KEY_ENV_VAR: &str = "GOOGLE_API_KEY";
pub const DEFAULT_DATA_DIR: &str = ".smart_swap";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0} must not be empty")]
    Empty(&'static str),
    #[error("Configuration error: invalid e-mail address '{0}'")]
    InvalidEmail(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Environment variable the API key is read from at request time.
    pub api_key_env_var: String,
    pub model: String,
    pub api_base_url: String,
    pub data_dir: PathBuf,
    /// Authenticated session e-mail; `None` means anonymous.
    pub user_email: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key_env_var: DEFAULT_API_KEY_ENV_VAR.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            user_email: None,
        }
    }
}

impl AppConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.api_key_env_var.trim().is_empty() {
            return Err(ConfigError::Empty("api key variable"));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Empty("model"));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Empty("api base url"));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Empty("data dir"));
        }
        if let Some(email) = &self.user_email {
            let email = email.trim();
            if !email.is_empty() && !email.contains('@') {
                return Err(ConfigError::InvalidEmail(email.to_string()));
            }
        }
        if !GEMINI_MODELS.iter().any(|m| m.model_name == self.model) {
            warn!(model = %self.model, "model is not in the known model list");
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default().validate().unwrap();
        assert_eq!(config.api_key_env_var, "GOOGLE_API_KEY");
        assert_eq!(config.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_empty_model_is_rejected() {
        let config = AppConfig {
            model: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Empty("model"))));
    }

    #[test]
    fn test_email_without_at_sign_is_rejected() {
        let config = AppConfig {
            user_email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidEmail(_))));
    }
}
