//! Advancements: declarative leveling effects carried by items.
//!
//! Each [`AdvancementDefinition`] holds one [`AdvancementKind`], a closed set
//! of seven variants. Every variant stores its own configuration plus the
//! values it has recorded per applied level, and implements the same
//! contract:
//!
//! - `value_for_level`: pure lookup of the effective value at a level.
//! - `apply`: record the value for a level and mutate the character.
//!   Applying twice with the same input leaves the same value.
//! - `reverse`: undo one level, returning [`RetainedData`].
//! - `restore`: re-apply a reversed level from its retained data without
//!   asking for input again.

mod ability_score;
mod collection;
mod defense;
mod error;
mod hit_points;
mod item_grant;
mod resource;
mod scale_value;
mod trait_grant;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::derived::DerivedCharacter;
use crate::entities::{Character, Item, ResourcePool};
use crate::error::DomainError;
use crate::ids::{AdvancementId, ItemId};
use crate::value_objects::{DiceFormula, SystemConfig};

pub use ability_score::{
    AbilityScoreAdvancement, AbilityScoreChoice, AbilityScoreConfiguration, AbilityScoreValue,
    AssignmentMethod, ScoreAssignmentConfig,
};
pub use collection::AdvancementCollection;
pub use defense::{DefenseAdvancement, DefenseConfiguration};
pub use error::AdvancementError;
pub use hit_points::{HitPointsAdvancement, HitPointsChoice, HitPointsConfiguration};
pub use item_grant::{ItemGrantAdvancement, ItemGrantChoice, ItemGrantConfiguration};
pub use resource::{ResourceAdvancement, ResourceAmount, ResourceConfiguration, ResourceGrant};
pub use scale_value::{ScaleType, ScaleValueAdvancement, ScaleValueConfiguration};
pub use trait_grant::{
    TraitAdvancement, TraitChoice, TraitChoicePool, TraitConfiguration, TraitGrant,
};

/// Type tag of an advancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdvancementType {
    AbilityScoreImprovement,
    Defense,
    HitPoints,
    ItemGrant,
    Resource,
    ScaleValue,
    Trait,
}

impl fmt::Display for AdvancementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AdvancementType::AbilityScoreImprovement => "Ability Score Improvement",
            AdvancementType::Defense => "Defense",
            AdvancementType::HitPoints => "Hit Points",
            AdvancementType::ItemGrant => "Item Grant",
            AdvancementType::Resource => "Resource",
            AdvancementType::ScaleValue => "Scale Value",
            AdvancementType::Trait => "Trait",
        };
        f.write_str(label)
    }
}

/// Effective value of an advancement at some level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelValue {
    Number(i32),
    Dice(DiceFormula),
    Text(String),
}

impl LevelValue {
    pub fn as_number(&self) -> Option<i32> {
        match self {
            LevelValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for LevelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelValue::Number(n) => write!(f, "{}", n),
            LevelValue::Dice(formula) => write!(f, "{}", formula),
            LevelValue::Text(text) => f.write_str(text),
        }
    }
}

/// User input submitted by a flow for a non-automatic step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvancementInput {
    AbilityScores(AbilityScoreChoice),
    HitPoints(HitPointsChoice),
    ItemGrant(ItemGrantChoice),
    Trait(TraitChoice),
}

/// An item removed by a reversal, with the position it held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetainedItem {
    pub index: usize,
    pub item: Item,
}

/// What a reversal hands back so the same outcome can be restored later.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum RetainedData {
    #[default]
    Nothing,
    /// The input the level was applied with.
    Choice(AdvancementInput),
    /// Items removed from the character, in ascending position order.
    Items(Vec<RetainedItem>),
    /// Amount removed from a resource pool, and the pool itself if the
    /// reversal removed it entirely.
    Resource {
        amount: i32,
        pool: Option<ResourcePool>,
    },
}

impl RetainedData {
    /// Input to pre-populate a flow with, if the retained data carries one.
    pub fn choice(&self) -> Option<&AdvancementInput> {
        match self {
            RetainedData::Choice(input) => Some(input),
            _ => None,
        }
    }
}

/// Everything an advancement may read or change while it runs.
pub struct AdvancementContext<'a> {
    pub actor: &'a mut Character,
    pub derived: &'a DerivedCharacter,
    pub config: &'a SystemConfig,
    /// Item that owns the running advancement.
    pub item_id: ItemId,
    pub advancement_id: AdvancementId,
}

/// The seven advancement behaviours, each with its configuration and the
/// values it has recorded per level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AdvancementKind {
    AbilityScoreImprovement(AbilityScoreAdvancement),
    Defense(DefenseAdvancement),
    HitPoints(HitPointsAdvancement),
    ItemGrant(ItemGrantAdvancement),
    Resource(ResourceAdvancement),
    ScaleValue(ScaleValueAdvancement),
    Trait(TraitAdvancement),
}

macro_rules! dispatch {
    ($kind:expr, $inner:ident => $body:expr) => {
        match $kind {
            AdvancementKind::AbilityScoreImprovement($inner) => $body,
            AdvancementKind::Defense($inner) => $body,
            AdvancementKind::HitPoints($inner) => $body,
            AdvancementKind::ItemGrant($inner) => $body,
            AdvancementKind::Resource($inner) => $body,
            AdvancementKind::ScaleValue($inner) => $body,
            AdvancementKind::Trait($inner) => $body,
        }
    };
}

impl AdvancementKind {
    pub fn advancement_type(&self) -> AdvancementType {
        match self {
            AdvancementKind::AbilityScoreImprovement(_) => AdvancementType::AbilityScoreImprovement,
            AdvancementKind::Defense(_) => AdvancementType::Defense,
            AdvancementKind::HitPoints(_) => AdvancementType::HitPoints,
            AdvancementKind::ItemGrant(_) => AdvancementType::ItemGrant,
            AdvancementKind::Resource(_) => AdvancementType::Resource,
            AdvancementKind::ScaleValue(_) => AdvancementType::ScaleValue,
            AdvancementKind::Trait(_) => AdvancementType::Trait,
        }
    }
}

/// One leveling effect authored onto an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancementDefinition {
    pub id: AdvancementId,
    #[serde(default)]
    pub title: String,
    pub levels: BTreeSet<u32>,
    pub kind: AdvancementKind,
}

impl AdvancementDefinition {
    pub fn new(kind: AdvancementKind, levels: impl IntoIterator<Item = u32>) -> Self {
        Self {
            id: AdvancementId::new(),
            title: kind.advancement_type().to_string(),
            levels: levels.into_iter().collect(),
            kind,
        }
    }

    pub fn with_id(mut self, id: AdvancementId) -> Self {
        self.id = id;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Data-model checks performed when a definition is authored onto an item.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.levels.is_empty() {
            return Err(DomainError::validation(
                "Advancement must trigger at one or more levels",
            ));
        }
        if self.levels.contains(&0) {
            return Err(DomainError::validation("Advancement levels start at 1"));
        }
        Ok(())
    }

    pub fn advancement_type(&self) -> AdvancementType {
        self.kind.advancement_type()
    }

    pub fn applies_at(&self, level: u32) -> bool {
        self.levels.contains(&level)
    }

    pub fn min_level(&self) -> Option<u32> {
        self.levels.first().copied()
    }

    /// Levels with a recorded value, ascending.
    pub fn applied_levels(&self) -> Vec<u32> {
        dispatch!(&self.kind, k => k.value.keys().copied().collect())
    }

    pub fn is_applied(&self, level: u32) -> bool {
        dispatch!(&self.kind, k => k.value.contains_key(&level))
    }

    pub fn has_history(&self) -> bool {
        dispatch!(&self.kind, k => !k.value.is_empty())
    }

    /// Drop every recorded value, as for a freshly copied item.
    pub fn clear_values(&mut self) {
        dispatch!(&mut self.kind, k => k.value.clear())
    }

    /// Whether `level` can be resolved without user input.
    pub fn is_automatic(&self, level: u32) -> bool {
        dispatch!(&self.kind, k => k.is_automatic(self.min_level(), level))
    }

    pub fn value_for_level(&self, level: u32) -> Option<LevelValue> {
        dispatch!(&self.kind, k => k.value_for_level(level))
    }

    pub fn apply(
        &mut self,
        level: u32,
        input: Option<&AdvancementInput>,
        ctx: &mut AdvancementContext<'_>,
    ) -> Result<(), AdvancementError> {
        self.check_level(level)?;
        let first = self.min_level();
        dispatch!(&mut self.kind, k => k.apply(first, level, input, ctx))
    }

    pub fn reverse(
        &mut self,
        level: u32,
        ctx: &mut AdvancementContext<'_>,
    ) -> Result<RetainedData, AdvancementError> {
        self.check_level(level)?;
        dispatch!(&mut self.kind, k => k.reverse(level, ctx))
    }

    pub fn restore(
        &mut self,
        level: u32,
        retained: &RetainedData,
        ctx: &mut AdvancementContext<'_>,
    ) -> Result<(), AdvancementError> {
        self.check_level(level)?;
        let first = self.min_level();
        dispatch!(&mut self.kind, k => k.restore(first, level, retained, ctx))
    }

    fn check_level(&self, level: u32) -> Result<(), AdvancementError> {
        if self.applies_at(level) {
            Ok(())
        } else {
            Err(AdvancementError::LevelNotConfigured { level })
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::Harness;
    use super::*;
    use crate::entities::ItemKind;

    #[test]
    fn definition_round_trips_through_json_with_values() {
        let mut definition = AdvancementDefinition::new(
            AdvancementKind::HitPoints(HitPointsAdvancement::with_denomination(8)),
            1..=3,
        );
        if let AdvancementKind::HitPoints(hp) = &mut definition.kind {
            hp.value.insert(1, 8);
            hp.value.insert(2, 5);
        }
        let json = serde_json::to_value(&definition).unwrap();
        assert_eq!(json["kind"]["HitPoints"]["value"]["2"], 5);
        let back: AdvancementDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(back, definition);
        assert_eq!(back.applied_levels(), vec![1, 2]);
    }

    #[test]
    fn apply_outside_configured_levels_fails() {
        let definition = AdvancementDefinition::new(
            AdvancementKind::Defense(DefenseAdvancement::with_bonuses([(2, 1)])),
            [2],
        );
        let id = definition.id;
        let item = Item::new("Smart Hero", ItemKind::Archetype).with_advancement(definition);
        let item_id = item.id;
        let mut harness = Harness::new(Character::new("Riley").with_item(item), item_id);
        assert_eq!(
            harness.apply(id, 3, None),
            Err(AdvancementError::LevelNotConfigured { level: 3 })
        );
        assert!(harness.apply(id, 2, None).is_ok());
        assert!(harness.definition(id).is_applied(2));
    }

    #[test]
    fn retained_choice_accessor() {
        let retained = RetainedData::Choice(AdvancementInput::HitPoints(HitPointsChoice {
            rolled: Some(4),
        }));
        assert!(retained.choice().is_some());
        assert!(RetainedData::Nothing.choice().is_none());
    }
}
