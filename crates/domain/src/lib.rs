//! Everyday Heroes character data model and advancement rules.
//!
//! Pure data and pure functions only: characters and their embedded items,
//! the advancement definitions those items carry, the ruleset
//! configuration, and the derived-data pipeline. The workflow that drives
//! advancements against a scratch copy of a character lives in
//! `heroes-engine`.

pub mod advancement;
pub mod common;
pub mod derived;
pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use advancement::{
    AbilityScoreAdvancement, AbilityScoreChoice, AdvancementCollection, AdvancementContext,
    AdvancementDefinition, AdvancementError, AdvancementInput, AdvancementKind, AdvancementType,
    AssignmentMethod, DefenseAdvancement, HitPointsAdvancement, HitPointsChoice,
    ItemGrantAdvancement, ItemGrantChoice, LevelValue, ResourceAdvancement, RetainedData,
    RetainedItem, ScaleValueAdvancement, TraitAdvancement, TraitChoice,
};
pub use derived::{derive_character, DerivedCharacter};
pub use entities::{
    Character, CharacterPatch, GrantOrigin, HitPointState, Item, ItemKind, RecoveryPeriod,
    ResourcePool,
};
pub use error::DomainError;
pub use ids::{AdvancementId, CharacterId, ItemId};
pub use value_objects::{
    ability_modifier, Ability, AbilityScores, DiceFormula, DiceParseError, DiceRollResult,
    PointBuyConfig, SystemConfig,
};
