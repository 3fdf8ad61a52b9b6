use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::identity::Identity;
use crate::storage::{self, keys, LocalStore, PreferenceBackend, StoreError};

pub const SCALE_MIN: u8 = 1;
pub const SCALE_MAX: u8 = 5;
pub const SCALE_DEFAULT: u8 = 3;

/// The six 1–5 taste and lifestyle dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceScale {
    Spice,
    Sweetness,
    Saltiness,
    Acidity,
    Health,
    Budget,
}

impl PreferenceScale {
    pub const ALL: [PreferenceScale; 6] = [
        PreferenceScale::Spice,
        PreferenceScale::Sweetness,
        PreferenceScale::Saltiness,
        PreferenceScale::Acidity,
        PreferenceScale::Health,
        PreferenceScale::Budget,
    ];

    pub fn field_name(self) -> &'static str {
        match self {
            PreferenceScale::Spice => "spice_tolerance",
            PreferenceScale::Sweetness => "sweetness_preference",
            PreferenceScale::Saltiness => "saltiness_preference",
            PreferenceScale::Acidity => "acidity_sourness_preference",
            PreferenceScale::Health => "health_consciousness",
            PreferenceScale::Budget => "budget_tolerance",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PreferenceScale::Spice => "Spice",
            PreferenceScale::Sweetness => "Sweetness",
            PreferenceScale::Saltiness => "Saltiness",
            PreferenceScale::Acidity => "Acidity",
            PreferenceScale::Health => "Health",
            PreferenceScale::Budget => "Budget",
        }
    }

    /// Wording for the low end of the scale, as used in prompts.
    pub fn min_label(self) -> &'static str {
        match self {
            PreferenceScale::Spice => "mild spice",
            PreferenceScale::Sweetness => "not sweet",
            PreferenceScale::Saltiness => "low salt",
            PreferenceScale::Acidity => "mild acidity",
            PreferenceScale::Health => "indulgent",
            PreferenceScale::Budget => "cheap",
        }
    }

    pub fn max_label(self) -> &'static str {
        match self {
            PreferenceScale::Spice => "very spicy",
            PreferenceScale::Sweetness => "very sweet",
            PreferenceScale::Saltiness => "salty",
            PreferenceScale::Acidity => "very sour",
            PreferenceScale::Health => "lean/healthy",
            PreferenceScale::Budget => "expensive",
        }
    }

    /// Short badge text shown next to a value on the settings view.
    pub fn display_label(self, value: u8) -> &'static str {
        let (low, mid, high) = match self {
            PreferenceScale::Spice => ("Mild", "Moderate", "Spicy"),
            PreferenceScale::Sweetness => ("Not Sweet", "Moderate", "Very Sweet"),
            PreferenceScale::Saltiness => ("Low Salt", "Moderate", "Salty"),
            PreferenceScale::Acidity => ("Mild", "Moderate", "Very Sour"),
            PreferenceScale::Health => ("Indulgent", "Balanced", "Lean"),
            PreferenceScale::Budget => ("Cheap", "Moderate", "Expensive"),
        };
        if value >= 4 {
            high
        } else if value <= 2 {
            low
        } else {
            mid
        }
    }
}

/// A user's dietary profile. Scale fields always hold a value in `1..=5`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPreferences")]
pub struct Preferences {
    pub diet: String,
    pub allergies: Vec<String>,
    pub spice_tolerance: u8,
    pub sweetness_preference: u8,
    pub saltiness_preference: u8,
    pub acidity_sourness_preference: u8,
    pub health_consciousness: u8,
    pub budget_tolerance: u8,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            diet: String::new(),
            allergies: Vec::new(),
            spice_tolerance: SCALE_DEFAULT,
            sweetness_preference: SCALE_DEFAULT,
            saltiness_preference: SCALE_DEFAULT,
            acidity_sourness_preference: SCALE_DEFAULT,
            health_consciousness: SCALE_DEFAULT,
            budget_tolerance: SCALE_DEFAULT,
        }
    }
}

impl Preferences {
    pub fn scale(&self, scale: PreferenceScale) -> u8 {
        match scale {
            PreferenceScale::Spice => self.spice_tolerance,
            PreferenceScale::Sweetness => self.sweetness_preference,
            PreferenceScale::Saltiness => self.saltiness_preference,
            PreferenceScale::Acidity => self.acidity_sourness_preference,
            PreferenceScale::Health => self.health_consciousness,
            PreferenceScale::Budget => self.budget_tolerance,
        }
    }

    /// Sets a scale, clamping the value into `1..=5`.
    pub fn set_scale(&mut self, scale: PreferenceScale, value: i64) {
        let clamped = clamp_scale(value);
        let slot = match scale {
            PreferenceScale::Spice => &mut self.spice_tolerance,
            PreferenceScale::Sweetness => &mut self.sweetness_preference,
            PreferenceScale::Saltiness => &mut self.saltiness_preference,
            PreferenceScale::Acidity => &mut self.acidity_sourness_preference,
            PreferenceScale::Health => &mut self.health_consciousness,
            PreferenceScale::Budget => &mut self.budget_tolerance,
        };
        *slot = clamped;
    }

    pub fn set_allergies<I, S>(&mut self, allergies: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allergies = normalize_allergies(allergies);
    }
}

fn clamp_scale(value: i64) -> u8 {
    value.clamp(SCALE_MIN as i64, SCALE_MAX as i64) as u8
}

fn normalize_allergies<I, S>(allergies: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for allergy in allergies {
        let trimmed = allergy.as_ref().trim();
        if !trimmed.is_empty() && !out.iter().any(|a| a.eq_ignore_ascii_case(trimmed)) {
            out.push(trimmed.to_string());
        }
    }
    out
}

/// Loosely-typed wire form. Everything is optional so that partial or
/// hand-edited records still load.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPreferences {
    diet: Option<Value>,
    allergies: Option<Value>,
    spice_tolerance: Option<Value>,
    sweetness_preference: Option<Value>,
    saltiness_preference: Option<Value>,
    acidity_sourness_preference: Option<Value>,
    health_consciousness: Option<Value>,
    budget_tolerance: Option<Value>,
}

fn coerce_scale(value: Option<&Value>) -> u8 {
    let numeric = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match numeric {
        Some(v) if v.is_finite() => clamp_scale(v.round() as i64),
        _ => SCALE_DEFAULT,
    }
}

impl From<RawPreferences> for Preferences {
    fn from(raw: RawPreferences) -> Self {
        let diet = match raw.diet {
            Some(Value::String(s)) => s.trim().to_string(),
            _ => String::new(),
        };
        let allergies = match raw.allergies {
            Some(Value::Array(items)) => {
                normalize_allergies(items.iter().filter_map(|v| v.as_str()))
            }
            Some(Value::String(s)) => normalize_allergies(s.split(',')),
            _ => Vec::new(),
        };
        Self {
            diet,
            allergies,
            spice_tolerance: coerce_scale(raw.spice_tolerance.as_ref()),
            sweetness_preference: coerce_scale(raw.sweetness_preference.as_ref()),
            saltiness_preference: coerce_scale(raw.saltiness_preference.as_ref()),
            acidity_sourness_preference: coerce_scale(raw.acidity_sourness_preference.as_ref()),
            health_consciousness: coerce_scale(raw.health_consciousness.as_ref()),
            budget_tolerance: coerce_scale(raw.budget_tolerance.as_ref()),
        }
    }
}

/// The durable record: the preferences plus the owning user and the store-assigned timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceDocument {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(flatten)]
    pub preferences: Preferences,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl PreferenceDocument {
    pub fn new(user_id: &str, preferences: Preferences, updated_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            preferences,
            updated_at,
        }
    }
}

/// Loads and saves preferences for an identity. Authenticated users are backed
/// by the document store; anonymous users by the local snapshot.
#[derive(Clone)]
pub struct PreferenceStore {
    backend: Arc<dyn PreferenceBackend>,
    local: Arc<dyn LocalStore>,
}

impl PreferenceStore {
    pub fn new(backend: Arc<dyn PreferenceBackend>, local: Arc<dyn LocalStore>) -> Self {
        Self { backend, local }
    }

    pub fn local_snapshot(&self) -> Option<Preferences> {
        storage::read_json(self.local.as_ref(), keys::PREFERENCES)
    }

    /// Preferences the user has actually saved, if any.
    pub async fn stored(&self, identity: &Identity) -> Option<Preferences> {
        match identity {
            Identity::Email(email) => match self.backend.find_one(email).await {
                Ok(Some(document)) => Some(document.preferences),
                Ok(None) => {
                    debug!(user = %email, "no stored preference document");
                    None
                }
                Err(e) => {
                    warn!(user = %email, error = %e, "preference backend unavailable");
                    None
                }
            },
            Identity::Anonymous(_) => self.local_snapshot(),
        }
    }

    /// Never fails: missing or unreachable data yields the default record.
    pub async fn load(&self, identity: &Identity) -> Preferences {
        self.stored(identity).await.unwrap_or_default()
    }

    /// Returns the store-assigned update time for durable saves.
    pub async fn save(
        &self,
        identity: &Identity,
        preferences: &Preferences,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        match identity {
            Identity::Email(email) => {
                let document = self.backend.upsert(email, preferences).await?;
                debug!(user = %email, updated_at = %document.updated_at, "preferences saved");
                Ok(Some(document.updated_at))
            }
            Identity::Anonymous(_) => {
                storage::write_json(self.local.as_ref(), keys::PREFERENCES, preferences)?;
                Ok(None)
            }
        }
    }
}
