use serde::Serialize;

use crate::preferences::{PreferenceScale, Preferences};
use crate::substitution::SubstituteCandidate;

/// Index of the highest-scoring candidate. Ties keep the earliest one.
pub fn best_index(candidates: &[SubstituteCandidate]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, candidate) in candidates.iter().enumerate() {
        match best {
            Some(current) if candidate.score > candidates[current].score => best = Some(idx),
            None => best = Some(idx),
            _ => {}
        }
    }
    best
}

pub fn best_substitute(candidates: &[SubstituteCandidate]) -> Option<&SubstituteCandidate> {
    best_index(candidates).map(|idx| &candidates[idx])
}

/// Reason keywords that signal a match for a scale at the given value. Empty when the value is not extreme.
fn keywords_for(scale: PreferenceScale, value: u8) -> &'static [&'static str] {
    match scale {
        PreferenceScale::Spice if value >= 4 => &["spicy"],
        PreferenceScale::Sweetness if value >= 4 => &["sweet"],
        PreferenceScale::Saltiness if value >= 4 => &["salty"],
        PreferenceScale::Acidity if value >= 4 => &["sour", "acidic"],
        PreferenceScale::Health if value >= 4 => &["lean", "healthy"],
        PreferenceScale::Budget if value <= 2 => &["cheap"],
        PreferenceScale::Budget if value >= 4 => &["expensive"],
        _ => &[],
    }
}

/// Heuristic: does the candidate's rationale mention something the user feels strongly about?
pub fn matches_preference(candidate: &SubstituteCandidate, preferences: Option<&Preferences>) -> bool {
    let Some(preferences) = preferences else {
        return false;
    };
    let reason = candidate.reason.to_lowercase();
    PreferenceScale::ALL.iter().any(|&scale| {
        keywords_for(scale, preferences.scale(scale))
            .iter()
            .any(|keyword| reason.contains(keyword))
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedCandidate {
    #[serde(flatten)]
    pub candidate: SubstituteCandidate,
    pub matches_preference: bool,
}

/// Candidates for one ingredient in their original order, with the best one marked.
#[derive(Debug, Clone, Serialize)]
pub struct RankedSubstitutes {
    pub ingredient: String,
    pub best: Option<usize>,
    pub candidates: Vec<AnnotatedCandidate>,
}

impl RankedSubstitutes {
    pub fn best(&self) -> Option<&AnnotatedCandidate> {
        self.best.and_then(|idx| self.candidates.get(idx))
    }
}

pub fn rank(
    ingredient: &str,
    candidates: &[SubstituteCandidate],
    preferences: Option<&Preferences>,
) -> RankedSubstitutes {
    RankedSubstitutes {
        ingredient: ingredient.to_string(),
        best: best_index(candidates),
        candidates: candidates
            .iter()
            .map(|candidate| AnnotatedCandidate {
                candidate: candidate.clone(),
                matches_preference: matches_preference(candidate, preferences),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, score: f64, reason: &str) -> SubstituteCandidate {
        SubstituteCandidate {
            substitute: name.to_string(),
            score,
            reason: reason.to_string(),
            cuisine_context: None,
            allergen_info: None,
            historical_notes: None,
        }
    }

    #[test]
    fn test_best_prefers_first_of_tied_scores() {
        let candidates = vec![
            candidate("a", 40.0, ""),
            candidate("b", 95.0, ""),
            candidate("c", 95.0, ""),
            candidate("d", 10.0, ""),
        ];
        assert_eq!(best_index(&candidates), Some(1));
        assert_eq!(best_substitute(&candidates).unwrap().substitute, "b");
    }

    #[test]
    fn test_best_of_empty_list_is_none() {
        assert!(best_substitute(&[]).is_none());
    }

    #[test]
    fn test_no_preferences_never_match() {
        assert!(!matches_preference(&candidate("x", 1.0, "Very SPICY"), None));
    }

    #[test]
    fn test_moderate_preferences_never_match() {
        let prefs = Preferences::default();
        assert!(!matches_preference(
            &candidate("x", 1.0, "spicy sweet salty sour lean cheap expensive"),
            Some(&prefs)
        ));
    }

    #[test]
    fn test_extreme_preferences_match_case_insensitively() {
        let mut prefs = Preferences::default();
        prefs.acidity_sourness_preference = 4;
        assert!(matches_preference(&candidate("Lemon", 80.0, "Bright and ACIDIC"), Some(&prefs)));
        assert!(!matches_preference(&candidate("Cream", 80.0, "Rich and smooth"), Some(&prefs)));
    }

    #[test]
    fn test_budget_uses_opposite_keywords() {
        let mut prefs = Preferences::default();
        prefs.budget_tolerance = 1;
        assert!(matches_preference(&candidate("Oats", 1.0, "a cheap pantry staple"), Some(&prefs)));
        assert!(!matches_preference(&candidate("Saffron", 1.0, "expensive but worth it"), Some(&prefs)));

        prefs.budget_tolerance = 5;
        assert!(matches_preference(&candidate("Saffron", 1.0, "expensive but worth it"), Some(&prefs)));
        assert!(!matches_preference(&candidate("Oats", 1.0, "a cheap pantry staple"), Some(&prefs)));
    }

    #[test]
    fn test_rank_keeps_original_order() {
        let mut prefs = Preferences::default();
        prefs.health_consciousness = 5;
        let ranked = rank(
            "butter",
            &[candidate("Ghee", 60.0, "rich"), candidate("Olive oil", 90.0, "a healthy fat")],
            Some(&prefs),
        );
        assert_eq!(ranked.candidates[0].candidate.substitute, "Ghee");
        assert_eq!(ranked.best().unwrap().candidate.substitute, "Olive oil");
        assert!(!ranked.candidates[0].matches_preference);
        assert!(ranked.candidates[1].matches_preference);
    }
}
