//! Process settings read from the environment.

use std::path::PathBuf;

pub const CHARACTER_PATH_VAR: &str = "HEROES_CHARACTER_PATH";
pub const LEVEL_DELTA_VAR: &str = "HEROES_LEVEL_DELTA";
pub const CHOICES_PATH_VAR: &str = "HEROES_CHOICES_PATH";
pub const SYSTEM_CONFIG_VAR: &str = "HEROES_SYSTEM_CONFIG";
pub const OUTPUT_PATH_VAR: &str = "HEROES_OUTPUT_PATH";

/// Settings for one run of the engine binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Character JSON to load.
    pub character_path: PathBuf,
    pub level_delta: i32,
    /// Prepared choices for interactive steps.
    pub choices_path: Option<PathBuf>,
    /// Ruleset overrides; the built-in Everyday Heroes ruleset otherwise.
    pub system_config_path: Option<PathBuf>,
    /// Where the committed character is written. Defaults to overwriting
    /// the input file.
    pub output_path: PathBuf,
}

impl EngineSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let character_path: PathBuf = var(CHARACTER_PATH_VAR)
            .unwrap_or_else(|| "character.json".into())
            .into();
        let level_delta = var(LEVEL_DELTA_VAR)
            .and_then(|value| match value.trim().parse() {
                Ok(delta) => Some(delta),
                Err(_) => {
                    tracing::warn!(value = %value, "Ignoring invalid {LEVEL_DELTA_VAR}");
                    None
                }
            })
            .unwrap_or(1);
        let output_path = var(OUTPUT_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| character_path.clone());

        Self {
            character_path,
            level_delta,
            choices_path: var(CHOICES_PATH_VAR).map(PathBuf::from),
            system_config_path: var(SYSTEM_CONFIG_VAR).map(PathBuf::from),
            output_path,
        }
    }
}
