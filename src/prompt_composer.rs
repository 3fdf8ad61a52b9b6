use std::collections::BTreeMap;

use crate::api_connection::endpoints::{
    Content, GenerateContentRequest, GenerationConfig, JsonSchema, SchemaType,
};
use crate::preferences::{PreferenceScale, Preferences};

pub const RESPONSE_MIME_TYPE: &str = "application/json";

/// Maps a 1–5 value to the qualitative phrase used in the prompt.
pub fn scale_phrase(value: u8, min_label: &str, max_label: &str) -> String {
    match value {
        0 | 1 => min_label.to_string(),
        2 => format!("slightly {}", min_label),
        3 => "moderate".to_string(),
        4 => format!("slightly {}", max_label),
        _ => max_label.to_string(),
    }
}

/// One sentence describing all six scales, or an empty string without preferences.
pub fn preference_summary(preferences: Option<&Preferences>) -> String {
    let Some(preferences) = preferences else {
        return String::new();
    };
    let phrases: Vec<String> = PreferenceScale::ALL
        .iter()
        .map(|&scale| {
            scale_phrase(
                preferences.scale(scale),
                scale.min_label(),
                scale.max_label(),
            )
        })
        .collect();
    format!("The user prefers: {}.", phrases.join(", "))
}

pub fn compose_prompt(ingredient: &str, preferences: Option<&Preferences>) -> String {
    let summary = preference_summary(preferences);
    let mut prompt = format!(
        "For the ingredient '{}', suggest 1–3 suitable substitutes. For each suggestion, return:\n\
         - 'substitute'\n\
         - 'score' (0–100 relevance)\n\
         - 'reason'\n\
         - 'cuisine_context' (optional)\n\
         - 'allergen_info' (e.g. dairy, nuts)\n\
         - 'historical_notes' (brief food history).",
        ingredient
    );
    if !summary.is_empty() {
        prompt.push(' ');
        prompt.push_str(&summary);
    }
    prompt.push_str(" Return the output as a JSON array.");
    prompt
}

/// Array of candidate objects; `substitute`, `score` and `reason` are required.
pub fn substitutes_response_schema() -> JsonSchema {
    let mut properties = BTreeMap::new();
    properties.insert(
        "substitute".to_string(),
        JsonSchema::scalar(SchemaType::String),
    );
    properties.insert("score".to_string(), JsonSchema::scalar(SchemaType::Number));
    properties.insert("reason".to_string(), JsonSchema::scalar(SchemaType::String));
    properties.insert(
        "cuisine_context".to_string(),
        JsonSchema::scalar(SchemaType::String),
    );
    properties.insert(
        "allergen_info".to_string(),
        JsonSchema::scalar(SchemaType::String),
    );
    properties.insert(
        "historical_notes".to_string(),
        JsonSchema::scalar(SchemaType::String),
    );

    let item = JsonSchema {
        schema_type: SchemaType::Object,
        description: None,
        items: None,
        properties: Some(properties),
        required: vec![
            "substitute".to_string(),
            "score".to_string(),
            "reason".to_string(),
        ],
    };

    JsonSchema {
        schema_type: SchemaType::Array,
        description: None,
        items: Some(Box::new(item)),
        properties: None,
        required: Vec::new(),
    }
}

pub fn build_request(ingredient: &str, preferences: Option<&Preferences>) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user_text(compose_prompt(ingredient, preferences))],
        generation_config: Some(GenerationConfig {
            response_mime_type: RESPONSE_MIME_TYPE.to_string(),
            response_schema: Some(substitutes_response_schema()),
        }),
    }
}
