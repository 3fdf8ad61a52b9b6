//! Plain-text views for the command-line front end.

use crate::history::HistoryEntry;
use crate::identity::Identity;
use crate::preferences::{PreferenceScale, Preferences};
use crate::ranking::{rank, AnnotatedCandidate, RankedSubstitutes};
use crate::substitution::GenerationError;

const MATCH_BADGE: &str = "[Matches your preference!]";
const BEST_MARKER: &str = "★";

fn detail_line(label: &str, value: Option<&str>) -> String {
    match value.filter(|s| !s.trim().is_empty()) {
        Some(value) => format!("      {}: {}\n", label, value),
        None => String::new(),
    }
}

fn render_candidate(annotated: &AnnotatedCandidate, is_best: bool) -> String {
    let c = &annotated.candidate;
    let marker = if is_best { BEST_MARKER } else { " " };
    let badge = if annotated.matches_preference {
        format!(" {}", MATCH_BADGE)
    } else {
        String::new()
    };
    let mut out = format!("  {} {} — Score: {}/100{}\n", marker, c.substitute, c.score, badge);
    out.push_str(&format!("      {}\n", c.reason));
    out.push_str(&detail_line("Cuisine", c.cuisine_context.as_deref()));
    out.push_str(&detail_line("Allergen Info", c.allergen_info.as_deref()));
    out.push_str(&detail_line("History", c.historical_notes.as_deref()));
    out
}

pub fn render_ranked(ranked: &RankedSubstitutes) -> String {
    let mut out = format!("Substitutes for {}:\n", ranked.ingredient);
    if ranked.candidates.is_empty() {
        out.push_str("  No substitutes found.\n");
    }
    for (idx, annotated) in ranked.candidates.iter().enumerate() {
        out.push_str(&render_candidate(annotated, ranked.best == Some(idx)));
    }
    out
}

pub fn render_failures(failures: &[GenerationError]) -> String {
    failures.iter().map(|f| format!("{}\n", f)).collect()
}

/// One line per entry, numbered from 1 for `history --show`.
pub fn render_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "Search history is empty.\n".to_string();
    }
    let mut out = String::from("Search History:\n");
    for (idx, entry) in entries.iter().enumerate() {
        out.push_str(&format!("{:>3}. {}  ({})\n", idx + 1, entry.ingredient, entry.timestamp));
        if let Some(best) = &entry.best_substitute {
            out.push_str(&format!("     Best Substitute: {}\n", best));
        }
        if let Some(allergens) = entry.allergen_info.as_deref().filter(|s| !s.is_empty()) {
            out.push_str(&format!("     Allergen Info: {}\n", allergens));
        }
    }
    out
}

/// Saved substitutes of one entry, annotated against the user's current preferences.
pub fn render_history_detail(entry: &HistoryEntry, preferences: Option<&Preferences>) -> String {
    let ranked = rank(&entry.ingredient, &entry.substitutes, preferences);
    let mut out = format!("Saved search from {}\n", entry.timestamp);
    out.push_str(&render_ranked(&ranked));
    out
}

pub fn render_preferences(preferences: &Preferences) -> String {
    let diet = if preferences.diet.is_empty() { "(none)" } else { preferences.diet.as_str() };
    let allergies = if preferences.allergies.is_empty() {
        "(none)".to_string()
    } else {
        preferences.allergies.join(", ")
    };
    let mut out = format!("Diet: {}\nAllergies: {}\nFlavor & Lifestyle Preferences:\n", diet, allergies);
    for scale in PreferenceScale::ALL {
        let value = preferences.scale(scale);
        out.push_str(&format!(
            "  {:<10} {}/5 ({})\n",
            format!("{}:", scale.title()),
            value,
            scale.display_label(value)
        ));
    }
    out
}

pub fn render_identity(identity: &Identity) -> String {
    format!("{} ({})\n", identity.user_id(), identity.kind())
}
