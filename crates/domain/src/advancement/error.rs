use thiserror::Error;

use crate::value_objects::{Ability, DiceParseError};

/// Recoverable, user-facing failure raised while applying, reversing or
/// restoring an advancement.
///
/// The advancement manager turns these into a message on the offending
/// step and re-offers it for input instead of aborting the workflow.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdvancementError {
    #[error("Advancement is not configured for level {level}")]
    LevelNotConfigured { level: u32 },

    #[error("Invalid advancement configuration: {0}")]
    InvalidConfiguration(String),

    #[error("This advancement needs a choice before it can be applied")]
    MissingInput,

    #[error("Invalid choice: {0}")]
    InvalidChoice(String),

    #[error("Spent {spent} points but only {available} are available")]
    PointsExceeded { spent: i32, available: i32 },

    #[error("{ability} cannot be raised above {cap}")]
    ScoreCapExceeded { ability: Ability, cap: i32 },

    #[error("Missing prerequisite: {0}")]
    MissingPrerequisite(String),

    #[error(transparent)]
    Formula(#[from] DiceParseError),

    #[error("Expected a {expected} choice")]
    InputMismatch { expected: &'static str },
}

impl AdvancementError {
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn invalid_choice(msg: impl Into<String>) -> Self {
        Self::InvalidChoice(msg.into())
    }

    pub fn missing_prerequisite(msg: impl Into<String>) -> Self {
        Self::MissingPrerequisite(msg.into())
    }
}
