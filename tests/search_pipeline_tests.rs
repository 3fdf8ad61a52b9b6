use async_trait::async_trait;
use smart_swap::api_connection::endpoints::{GenerateContentRequest, Provider, DEFAULT_BASE_URL};
use smart_swap::api_connection::ApiConnectionError;
use smart_swap::app::{SearchError, SmartSwap};
use smart_swap::identity::IdentityKind;
use smart_swap::preferences::Preferences;
use smart_swap::storage::{
    keys, FileStore, JsonFileDocumentStore, LocalStore, MemoryDocumentStore, MemoryStore,
    PreferenceBackend,
};
use smart_swap::substitution::{find_substitutes, GenerationErrorKind, SubstituteGenerator};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

type Scripted = Result<String, fn() -> ApiConnectionError>;

/// Answers each prompt by looking up which scripted ingredient it mentions.
struct ScriptedGenerator {
    responses: Vec<(&'static str, Scripted)>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new(responses: Vec<(&'static str, Scripted)>) -> Self {
        Self {
            responses,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubstituteGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, ApiConnectionError> {
        let prompt = request.contents[0].parts[0].text.clone();
        self.prompts.lock().unwrap().push(prompt.clone());
        for (ingredient, response) in &self.responses {
            if prompt.contains(&format!("'{}'", ingredient)) {
                return match response {
                    Ok(text) => Ok(text.clone()),
                    Err(make_error) => Err(make_error()),
                };
            }
        }
        panic!("unscripted prompt: {}", prompt);
    }
}

const MILK_RESPONSE: &str = r#"[
    {"substitute": "Oat milk", "score": 92, "reason": "Creamy and sweet", "allergen_info": "gluten"},
    {"substitute": "Soy milk", "score": 88, "reason": "High protein", "allergen_info": "soy"}
]"#;

const BUTTER_RESPONSE: &str = r#"[
    {"substitute": "Olive oil", "score": 95, "reason": "A healthy fat"},
    {"substitute": "Ghee", "score": 95, "reason": "Rich and nutty", "allergen_info": "dairy"},
    {"substitute": "Applesauce", "score": 40, "reason": "Cheap baking swap"}
]"#;

fn quota_exceeded() -> ApiConnectionError {
    ApiConnectionError::ApiError {
        status: reqwest::StatusCode::TOO_MANY_REQUESTS,
        error_body: "API quota exceeded".to_string(),
    }
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn session(generator: Arc<ScriptedGenerator>, email: Option<&str>) -> SmartSwap {
    SmartSwap::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryDocumentStore::new()),
        generator,
        email,
    )
}

#[tokio::test]
async fn test_malformed_response_is_scoped_to_its_ingredient() {
    let generator = ScriptedGenerator::new(vec![
        ("milk", Ok(MILK_RESPONSE.to_string())),
        ("unicorn-dust", Ok("this is {not json".to_string())),
    ]);

    let report = find_substitutes(&generator, &names(&["milk", "unicorn-dust"]), None)
        .await
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert!(report.results.contains_key("milk"));
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].ingredient, "unicorn-dust");
    assert!(matches!(report.failures[0].kind, GenerationErrorKind::Malformed(_)));
    assert!(report.failures[0].to_string().contains("\"unicorn-dust\""));
    assert!(!report.is_complete_failure());
}

#[tokio::test]
async fn test_api_errors_do_not_stop_later_ingredients() {
    let generator = ScriptedGenerator::new(vec![
        ("truffle", Err(quota_exceeded as fn() -> ApiConnectionError)),
        ("milk", Ok(MILK_RESPONSE.to_string())),
    ]);

    let report = find_substitutes(&generator, &names(&["truffle", "milk"]), None)
        .await
        .unwrap();

    assert_eq!(generator.prompts().len(), 2);
    assert_eq!(report.order, vec!["milk".to_string()]);
    assert!(matches!(report.failures[0].kind, GenerationErrorKind::Api(_)));
}

#[tokio::test]
async fn test_missing_api_key_aborts_the_whole_search() {
    let provider = Arc::new(Provider::gemini(
        "SMART_SWAP_TEST_KEY_THAT_IS_NEVER_SET",
        DEFAULT_BASE_URL,
        "gemini-2.0-flash",
    ));
    let mut app = SmartSwap::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryDocumentStore::new()),
        provider,
        None,
    );

    let result = app.search(&names(&["milk", "eggs"])).await;
    assert!(matches!(result, Err(SearchError::MissingApiKey(ref var)) if var == "SMART_SWAP_TEST_KEY_THAT_IS_NEVER_SET"));
    assert!(app.history().is_empty());
}

#[tokio::test]
async fn test_blank_input_is_rejected_before_any_request() {
    let generator = Arc::new(ScriptedGenerator::new(vec![]));
    let mut app = session(generator.clone(), None);
    assert!(matches!(
        app.search(&names(&["  ", ""])).await,
        Err(SearchError::NoIngredients)
    ));
    assert!(generator.prompts().is_empty());
}

#[tokio::test]
async fn test_prompt_reflects_saved_preferences() {
    let generator = Arc::new(ScriptedGenerator::new(vec![(
        "butter",
        Ok(BUTTER_RESPONSE.to_string()),
    )]));
    let mut app = session(generator.clone(), Some("cook@example.com"));

    app.search(&names(&["butter"])).await.unwrap();
    assert!(!generator.prompts()[0].contains("The user prefers"));

    let mut prefs = Preferences::default();
    prefs.spice_tolerance = 5;
    app.save_preferences(&prefs).await.unwrap();

    app.search(&names(&["butter"])).await.unwrap();
    assert!(generator.prompts()[1].contains("very spicy"));
}

#[tokio::test]
async fn test_anonymous_preferences_do_not_follow_a_new_account() {
    let local: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
    let backend = Arc::new(MemoryDocumentStore::new());
    let generator = Arc::new(ScriptedGenerator::new(vec![(
        "butter",
        Ok(BUTTER_RESPONSE.to_string()),
    )]));

    let anonymous = SmartSwap::new(local.clone(), backend.clone(), generator.clone(), None);
    let mut prefs = Preferences::default();
    prefs.spice_tolerance = 5;
    anonymous.save_preferences(&prefs).await.unwrap();

    let mut account = SmartSwap::new(local, backend.clone(), generator.clone(), Some("new@example.com"));
    assert!(backend.find_one("new@example.com").await.unwrap().is_none());
    assert_eq!(account.load_preferences().await, Preferences::default());

    account.search(&names(&["butter"])).await.unwrap();
    let prompt = &generator.prompts()[0];
    assert!(!prompt.contains("The user prefers"));
    assert!(!prompt.contains("very spicy"));
}

#[tokio::test]
async fn test_empty_candidate_list_is_kept_and_recorded() {
    let generator = Arc::new(ScriptedGenerator::new(vec![
        ("butter", Ok("[]".to_string())),
        ("milk", Ok(MILK_RESPONSE.to_string())),
    ]));
    let mut app = session(generator, None);

    let outcome = app.search(&names(&["butter", "milk"])).await.unwrap();
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.ranked.len(), 2);
    assert_eq!(outcome.ranked[0].ingredient, "butter");
    assert!(outcome.ranked[0].candidates.is_empty());
    assert!(outcome.ranked[0].best().is_none());

    let history = app.history().entries();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].ingredient, "butter");
    assert!(history[1].best_substitute.is_none());
    assert!(history[1].allergen_info.is_none());
    assert!(history[1].substitutes.is_empty());
}

#[tokio::test]
async fn test_search_ranks_annotates_and_records_history() {
    let generator = Arc::new(ScriptedGenerator::new(vec![
        ("butter", Ok(BUTTER_RESPONSE.to_string())),
        ("milk", Ok(MILK_RESPONSE.to_string())),
    ]));
    let mut app = session(generator, None);

    let mut prefs = Preferences::default();
    prefs.budget_tolerance = 1;
    app.save_preferences(&prefs).await.unwrap();

    let outcome = app.search(&names(&["butter", "milk"])).await.unwrap();
    assert!(outcome.failures.is_empty());

    let butter = &outcome.ranked[0];
    assert_eq!(butter.ingredient, "butter");
    assert_eq!(butter.best().unwrap().candidate.substitute, "Olive oil");
    let flagged: Vec<&str> = butter
        .candidates
        .iter()
        .filter(|c| c.matches_preference)
        .map(|c| c.candidate.substitute.as_str())
        .collect();
    assert_eq!(flagged, vec!["Applesauce"]);

    let history = app.history().entries();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].ingredient, "milk");
    assert_eq!(history[0].best_substitute.as_deref(), Some("Oat milk"));
    assert_eq!(history[0].allergen_info.as_deref(), Some("gluten"));
    assert_eq!(history[1].ingredient, "butter");
    assert_eq!(history[1].best_substitute.as_deref(), Some("Olive oil"));
    assert_eq!(history[1].substitutes.len(), 3);
}

#[tokio::test]
async fn test_history_survives_a_new_session_until_cleared() {
    let dir = tempdir().unwrap();
    let local: Arc<dyn LocalStore> = Arc::new(FileStore::open(dir.path()).unwrap());
    let backend = Arc::new(JsonFileDocumentStore::new(dir.path().join("userSettings.json")));
    let generator = Arc::new(ScriptedGenerator::new(vec![(
        "milk",
        Ok(MILK_RESPONSE.to_string()),
    )]));

    let mut first = SmartSwap::new(local.clone(), backend.clone(), generator.clone(), None);
    first.search(&names(&["milk"])).await.unwrap();
    let anonymous_id = first.identity().user_id().to_string();

    let mut second = SmartSwap::new(local.clone(), backend.clone(), generator.clone(), None);
    assert_eq!(second.identity().user_id(), anonymous_id);
    assert_eq!(second.history().len(), 1);

    second.clear_history();
    let third = SmartSwap::new(local, backend, generator, None);
    assert!(third.history().is_empty());
}

#[tokio::test]
async fn test_corrupt_local_records_fall_back_to_defaults() {
    let dir = tempdir().unwrap();
    let local = Arc::new(FileStore::open(dir.path()).unwrap());
    local.set(keys::ANONYMOUS_ID, "<<<").unwrap();
    local.set(keys::PREFERENCES, "{\"spice_tolerance\": ").unwrap();
    local.set(keys::SEARCH_HISTORY, "[1, 2, oops]").unwrap();

    let app = SmartSwap::new(
        local,
        Arc::new(MemoryDocumentStore::new()),
        Arc::new(ScriptedGenerator::new(vec![])),
        None,
    );

    assert_eq!(app.identity().kind(), IdentityKind::Anonymous);
    assert_eq!(app.identity().user_id().len(), 32);
    assert!(app.history().is_empty());
    assert!(app.stored_preferences().await.is_none());
    assert_eq!(app.load_preferences().await, Preferences::default());
}

#[tokio::test]
async fn test_unreachable_backend_degrades_to_defaults() {
    let backend = Arc::new(MemoryDocumentStore::new());
    backend.set_unavailable(true);
    let app = SmartSwap::new(
        Arc::new(MemoryStore::new()),
        backend,
        Arc::new(ScriptedGenerator::new(vec![])),
        Some("cook@example.com"),
    );
    assert_eq!(app.identity().kind(), IdentityKind::Email);
    assert_eq!(app.load_preferences().await, Preferences::default());
    assert!(app.save_preferences(&Preferences::default()).await.is_err());
}
