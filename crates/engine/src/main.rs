//! Everyday Heroes engine - applies a level change to a character file.

use std::sync::Arc;

use anyhow::Context;
use heroes_domain::{Character, SystemConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use heroes_engine::infrastructure::json_files::{read_json, write_json};
use heroes_engine::infrastructure::memory_store::InMemoryCharacterStore;
use heroes_engine::infrastructure::ports::CharacterStore;
use heroes_engine::infrastructure::scripted_flow::{ScriptedChoice, ScriptedFlow};
use heroes_engine::infrastructure::settings::EngineSettings;
use heroes_engine::use_cases::advancement::{
    AdvancementUseCases, ManagerContext, WorkflowError, WorkflowOutcome,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root so `cargo run -p heroes-engine` works from anywhere.
    load_dotenv_from_repo_root();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heroes_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = EngineSettings::from_env();
    tracing::info!(
        character = %settings.character_path.display(),
        delta = settings.level_delta,
        "Starting Everyday Heroes engine"
    );

    let config = match &settings.system_config_path {
        Some(path) => read_json::<SystemConfig>(path)
            .with_context(|| format!("loading ruleset from {}", path.display()))?,
        None => SystemConfig::everyday_heroes(),
    };
    config.validate().context("invalid ruleset")?;

    let character: Character = read_json(&settings.character_path)
        .with_context(|| format!("loading character from {}", settings.character_path.display()))?;
    let choices: Vec<ScriptedChoice> = match &settings.choices_path {
        Some(path) => read_json(path)
            .with_context(|| format!("loading choices from {}", path.display()))?,
        None => Vec::new(),
    };

    let character_id = character.id;
    let store = Arc::new(InMemoryCharacterStore::new());
    store.insert(character).await;

    let use_cases = AdvancementUseCases::new(
        store.clone(),
        Arc::new(ScriptedFlow::new(choices)),
        ManagerContext::new(Arc::new(config)),
    );

    match use_cases.change_level(character_id, settings.level_delta).await {
        Ok(WorkflowOutcome::Committed(summary)) => {
            tracing::info!(
                level = summary.level,
                created = summary.created.len(),
                deleted = summary.deleted.len(),
                "Level change committed"
            );
        }
        Ok(WorkflowOutcome::NothingToDo) => {
            tracing::info!("Level change had nothing to do");
            return Ok(());
        }
        Ok(WorkflowOutcome::Vetoed) => {
            tracing::info!("Level change vetoed");
            return Ok(());
        }
        Err(WorkflowError::Cancelled) => {
            tracing::info!("Level change cancelled; character left unchanged");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    }

    let committed = store
        .get(character_id)
        .await?
        .context("character vanished from the store")?;
    write_json(&settings.output_path, &committed)
        .with_context(|| format!("writing {}", settings.output_path.display()))?;
    tracing::info!(output = %settings.output_path.display(), "Character written");

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
