use anyhow::{Context, Result};
use smart_swap::app::{SearchError, SmartSwap};
use smart_swap::cli::{parse_args, Command, HistoryAction, SettingsAction};
use smart_swap::render;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_search(app: &mut SmartSwap, ingredients: &[String]) -> Result<()> {
    println!("Finding substitutes...");
    match app.search(ingredients).await {
        Ok(outcome) => {
            for ranked in &outcome.ranked {
                println!();
                print!("{}", render::render_ranked(ranked));
            }
            if !outcome.failures.is_empty() {
                println!();
                eprint!("{}", render::render_failures(&outcome.failures));
            }
            Ok(())
        }
        Err(e @ SearchError::MissingApiKey(_)) => Err(e).context("search aborted, set the key in .env or the environment"),
        Err(e) => Err(e).context("search failed"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok(); // Load .env for the API key

    let cli = parse_args();
    init_logging(cli.verbose);

    let config = cli.app_config().validate()?;
    debug!(?config, "configuration resolved");

    let mut app = SmartSwap::open(&config).with_context(|| {
        format!("Failed to open local data directory '{}'", config.data_dir.display())
    })?;

    match cli.command {
        Command::Search { ingredients } => run_search(&mut app, &ingredients).await?,
        Command::History {
            action: Some(HistoryAction::Clear),
            ..
        } => {
            app.clear_history();
            println!("Search history cleared.");
        }
        Command::History { show: Some(n), .. } => {
            let entry = n
                .checked_sub(1)
                .and_then(|idx| app.history().get(idx))
                .with_context(|| format!("No history entry #{} ({} stored)", n, app.history().len()))?;
            let preferences = app.stored_preferences().await;
            print!("{}", render::render_history_detail(entry, preferences.as_ref()));
        }
        Command::History { .. } => {
            print!("{}", render::render_history(app.history().entries()));
        }
        Command::Settings {
            action: SettingsAction::Show,
        } => {
            let preferences = app.load_preferences().await;
            print!("{}", render::render_preferences(&preferences));
        }
        Command::Settings {
            action: SettingsAction::Set(update),
        } => {
            let preferences = update.apply(app.load_preferences().await);
            let saved_at = app
                .save_preferences(&preferences)
                .await
                .context("Failed to save settings")?;
            match saved_at {
                Some(at) => println!("Settings saved ({}).", at.to_rfc3339()),
                None => println!("Settings saved locally."),
            }
            print!("{}", render::render_preferences(&preferences));
        }
        Command::Whoami => {
            print!("{}", render::render_identity(app.identity()));
        }
    }

    Ok(())
}
