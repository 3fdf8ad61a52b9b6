use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{AppConfig, DEFAULT_API_KEY_ENV_VAR, DEFAULT_DATA_DIR};
use crate::api_connection::endpoints::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::preferences::{PreferenceScale, Preferences};

#[derive(Parser, Debug)]
#[command(author, version, about = "Find ingredient substitutes tuned to your taste", long_about = None)]
pub struct Cli {
    /// Authenticated account e-mail; omit to use the anonymous local identity
    #[arg(long, global = true, env = "SMART_SWAP_EMAIL")]
    pub email: Option<String>,

    /// Directory holding local state (identity, preferences, history)
    #[arg(long, global = true, env = "SMART_SWAP_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Gemini model used for suggestions
    #[arg(long, global = true, env = "SMART_SWAP_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, global = true, env = "SMART_SWAP_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub api_base_url: String,

    /// Name of the environment variable that holds the API key
    #[arg(long, global = true, env = "SMART_SWAP_API_KEY_ENV", default_value = DEFAULT_API_KEY_ENV_VAR)]
    pub api_key_env: String,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Suggest substitutes for one or more ingredients
    Search {
        #[arg(required = true)]
        ingredients: Vec<String>,
    },
    /// Show or clear past searches
    History {
        /// Expand the saved substitutes of entry N (1 = newest)
        #[arg(long, value_name = "N")]
        show: Option<usize>,
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },
    /// View or change dietary preferences
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Print the active identity
    Whoami,
}

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    Show,
    Set(SettingsUpdate),
}

#[derive(Args, Debug, Default)]
pub struct SettingsUpdate {
    #[arg(long)]
    pub diet: Option<String>,
    /// Replaces the allergy list; repeat or comma-separate
    #[arg(long = "allergy", value_delimiter = ',')]
    pub allergies: Option<Vec<String>>,
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..=5))]
    pub spice: Option<i64>,
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..=5))]
    pub sweetness: Option<i64>,
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..=5))]
    pub saltiness: Option<i64>,
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..=5))]
    pub acidity: Option<i64>,
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..=5))]
    pub health: Option<i64>,
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..=5))]
    pub budget: Option<i64>,
}

impl SettingsUpdate {
    /// Overlays the provided flags onto existing preferences.
    pub fn apply(&self, mut preferences: Preferences) -> Preferences {
        if let Some(diet) = &self.diet {
            preferences.diet = diet.trim().to_string();
        }
        if let Some(allergies) = &self.allergies {
            preferences.set_allergies(allergies);
        }
        let scales = [
            (PreferenceScale::Spice, self.spice),
            (PreferenceScale::Sweetness, self.sweetness),
            (PreferenceScale::Saltiness, self.saltiness),
            (PreferenceScale::Acidity, self.acidity),
            (PreferenceScale::Health, self.health),
            (PreferenceScale::Budget, self.budget),
        ];
        for (scale, value) in scales {
            if let Some(value) = value {
                preferences.set_scale(scale, value);
            }
        }
        preferences
    }
}

impl Cli {
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            api_key_env_var: self.api_key_env.clone(),
            model: self.model.clone(),
            api_base_url: self.api_base_url.clone(),
            data_dir: self.data_dir.clone(),
            user_email: self.email.clone().filter(|e| !e.trim().is_empty()),
        }
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
