//! Ruleset configuration.
//!
//! Everything the advancement rules need to know about the game system is
//! held in one read-only [`SystemConfig`], built once at load time and passed
//! to the advancement manager and the definitions it drives. There is no
//! global registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::dice::{DiceFormula, DiceParseError};
use crate::entities::ItemKind;
use crate::error::DomainError;

/// Point-buy cost table and budget for initial ability score assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointBuyConfig {
    /// Total points available.
    pub budget: u32,
    /// Cost of each purchasable score. Scores missing from the table
    /// cannot be bought.
    pub costs: BTreeMap<i32, u32>,
}

impl PointBuyConfig {
    pub fn cost(&self, score: i32) -> Option<u32> {
        self.costs.get(&score).copied()
    }

    pub fn min_score(&self) -> Option<i32> {
        self.costs.keys().next().copied()
    }

    pub fn max_score(&self) -> Option<i32> {
        self.costs.keys().next_back().copied()
    }
}

impl Default for PointBuyConfig {
    fn default() -> Self {
        Self {
            budget: 27,
            costs: BTreeMap::from([
                (8, 0),
                (9, 1),
                (10, 2),
                (11, 3),
                (12, 4),
                (13, 5),
                (14, 7),
                (15, 9),
            ]),
        }
    }
}

/// Read-only ruleset configuration shared by every workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfig {
    /// Highest character level reachable.
    pub max_level: u32,
    /// Proficiency bonus at first level.
    pub proficiency_base: i32,
    /// Levels between proficiency increases.
    pub proficiency_step: u32,
    /// Ability score ceiling used when an advancement does not set one.
    pub default_score_cap: i32,
    /// Defense before ability modifiers and bonuses.
    pub base_defense: i32,
    pub point_buy: PointBuyConfig,
    pub standard_array: Vec<i32>,
    /// Formula rolled once per ability by the roll assignment method.
    pub ability_roll: String,
    /// Concept item kinds applied ahead of every other item on level
    /// changes, in this order.
    pub concept_order: Vec<ItemKind>,
}

impl SystemConfig {
    /// Built-in Everyday Heroes defaults.
    pub fn everyday_heroes() -> Self {
        Self {
            max_level: 10,
            proficiency_base: 2,
            proficiency_step: 4,
            default_score_cap: 20,
            base_defense: 10,
            point_buy: PointBuyConfig::default(),
            standard_array: vec![15, 14, 13, 12, 10, 8],
            ability_roll: "4d6kh3".to_string(),
            concept_order: vec![ItemKind::Archetype, ItemKind::Class],
        }
    }

    /// Check a loaded configuration before it is shared with workflows.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_level == 0 {
            return Err(DomainError::validation("maxLevel must be at least 1"));
        }
        if self.proficiency_step == 0 {
            return Err(DomainError::validation("proficiencyStep must be at least 1"));
        }
        if self.standard_array.len() != 6 {
            return Err(DomainError::validation(
                "standardArray must contain one score per ability",
            ));
        }
        if self.point_buy.costs.is_empty() {
            return Err(DomainError::validation("pointBuy.costs cannot be empty"));
        }
        self.ability_roll_formula()?;
        Ok(())
    }

    pub fn proficiency_bonus(&self, level: u32) -> i32 {
        let steps = level.saturating_sub(1) / self.proficiency_step;
        self.proficiency_base + steps as i32
    }

    pub fn ability_roll_formula(&self) -> Result<DiceFormula, DiceParseError> {
        DiceFormula::parse(&self.ability_roll)
    }

    /// Position of a concept kind in the level-change ordering, if any.
    pub fn concept_rank(&self, kind: ItemKind) -> Option<usize> {
        self.concept_order.iter().position(|k| *k == kind)
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self::everyday_heroes()
    }
}
