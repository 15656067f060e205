//! Value objects - Immutable objects defined by their attributes

mod ability;
mod dice;
mod system_config;

pub use ability::{ability_modifier, Ability, AbilityScores, DEFAULT_SCORE};
pub use dice::{DiceFormula, DiceParseError, DiceRollResult};
pub use system_config::{PointBuyConfig, SystemConfig};
