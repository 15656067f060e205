//! Ability score assignment and improvement.
//!
//! An advancement with an `assignment` block sets all six scores at once by
//! one of three methods (roll, point-buy, standard array). Without it, the
//! advancement is an improvement: the player spends a pool of points as +1
//! steps on eligible abilities, never above the cap.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{AdvancementContext, AdvancementError, AdvancementInput, LevelValue, RetainedData};
use crate::value_objects::{
    Ability, AbilityScores, DiceFormula, DiceParseError, PointBuyConfig, SystemConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssignmentMethod {
    Roll,
    PointBuy,
    StandardArray,
}

fn all_methods() -> BTreeSet<AssignmentMethod> {
    BTreeSet::from([
        AssignmentMethod::Roll,
        AssignmentMethod::PointBuy,
        AssignmentMethod::StandardArray,
    ])
}

/// Overrides for the ruleset's assignment defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreAssignmentConfig {
    #[serde(default = "all_methods")]
    pub methods: BTreeSet<AssignmentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_buy: Option<PointBuyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_array: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_formula: Option<String>,
}

impl Default for ScoreAssignmentConfig {
    fn default() -> Self {
        Self {
            methods: all_methods(),
            point_buy: None,
            standard_array: None,
            roll_formula: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityScoreConfiguration {
    /// Improvement points to spend.
    #[serde(default)]
    pub points: u32,
    /// Score ceiling. Defaults to the ruleset cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap: Option<i32>,
    /// Increases applied without a choice.
    #[serde(default)]
    pub fixed: BTreeMap<Ability, i32>,
    /// Abilities the points cannot be spent on.
    #[serde(default)]
    pub locked: BTreeSet<Ability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment: Option<ScoreAssignmentConfig>,
}

/// Flow submission: absolute scores in assignment mode, increases otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityScoreChoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<AssignmentMethod>,
    #[serde(default)]
    pub rolls: Vec<i32>,
    #[serde(default)]
    pub assignments: BTreeMap<Ability, i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityScoreValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<AssignmentMethod>,
    #[serde(default)]
    pub rolls: Vec<i32>,
    #[serde(default)]
    pub assignments: BTreeMap<Ability, i32>,
    /// Net change made to each score.
    pub applied: BTreeMap<Ability, i32>,
}

impl AbilityScoreValue {
    fn choice(&self) -> AbilityScoreChoice {
        AbilityScoreChoice {
            method: self.method,
            rolls: self.rolls.clone(),
            assignments: self.assignments.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityScoreAdvancement {
    pub configuration: AbilityScoreConfiguration,
    #[serde(default)]
    pub value: BTreeMap<u32, AbilityScoreValue>,
}

impl AbilityScoreAdvancement {
    pub fn improvement(points: u32) -> Self {
        Self {
            configuration: AbilityScoreConfiguration {
                points,
                ..Default::default()
            },
            value: BTreeMap::new(),
        }
    }

    pub fn assignment(assignment: ScoreAssignmentConfig) -> Self {
        Self {
            configuration: AbilityScoreConfiguration {
                assignment: Some(assignment),
                ..Default::default()
            },
            value: BTreeMap::new(),
        }
    }

    pub fn with_fixed(mut self, ability: Ability, amount: i32) -> Self {
        self.configuration.fixed.insert(ability, amount);
        self
    }

    pub fn with_cap(mut self, cap: i32) -> Self {
        self.configuration.cap = Some(cap);
        self
    }

    pub fn locking(mut self, ability: Ability) -> Self {
        self.configuration.locked.insert(ability);
        self
    }

    pub fn cap(&self, config: &SystemConfig) -> i32 {
        self.configuration.cap.unwrap_or(config.default_score_cap)
    }

    pub fn point_buy<'a>(&'a self, config: &'a SystemConfig) -> &'a PointBuyConfig {
        self.configuration
            .assignment
            .as_ref()
            .and_then(|a| a.point_buy.as_ref())
            .unwrap_or(&config.point_buy)
    }

    pub fn standard_array<'a>(&'a self, config: &'a SystemConfig) -> &'a [i32] {
        self.configuration
            .assignment
            .as_ref()
            .and_then(|a| a.standard_array.as_deref())
            .unwrap_or(&config.standard_array)
    }

    pub fn roll_formula(&self, config: &SystemConfig) -> Result<DiceFormula, DiceParseError> {
        match self
            .configuration
            .assignment
            .as_ref()
            .and_then(|a| a.roll_formula.as_deref())
        {
            Some(formula) => DiceFormula::parse(formula),
            None => config.ability_roll_formula(),
        }
    }

    /// Improvement points left after `choice`.
    pub fn points_remaining(&self, choice: &AbilityScoreChoice) -> i32 {
        let spent: i32 = choice.assignments.values().filter(|d| **d > 0).sum();
        self.configuration.points as i32 - spent
    }

    /// Point-buy budget left after buying `assignments`.
    pub fn point_buy_remaining(
        &self,
        config: &SystemConfig,
        assignments: &BTreeMap<Ability, i32>,
    ) -> Result<i32, AdvancementError> {
        let table = self.point_buy(config);
        let mut spent = 0;
        for (ability, score) in assignments {
            let cost = table.cost(*score).ok_or_else(|| {
                AdvancementError::invalid_choice(format!(
                    "{} cannot be bought at {}",
                    ability, score
                ))
            })?;
            spent += cost as i32;
        }
        Ok(table.budget as i32 - spent)
    }

    /// Standard array entries not yet assigned.
    pub fn standard_array_remaining(
        &self,
        config: &SystemConfig,
        assignments: &BTreeMap<Ability, i32>,
    ) -> Vec<i32> {
        let mut remaining = self.standard_array(config).to_vec();
        for score in assignments.values() {
            if let Some(pos) = remaining.iter().position(|s| s == score) {
                remaining.remove(pos);
            }
        }
        remaining
    }

    /// One roll of the assignment formula per ability.
    pub fn roll_set<R: Rng + ?Sized>(
        &self,
        config: &SystemConfig,
        rng: &mut R,
    ) -> Result<Vec<i32>, DiceParseError> {
        let formula = self.roll_formula(config)?;
        Ok(Ability::ALL
            .iter()
            .map(|_| formula.roll(rng).total)
            .collect())
    }

    pub(super) fn is_automatic(&self, _first: Option<u32>, _level: u32) -> bool {
        self.configuration.assignment.is_none() && self.configuration.points == 0
    }

    /// Net score change made at or below `level`.
    pub(super) fn value_for_level(&self, level: u32) -> Option<LevelValue> {
        let values: Vec<&AbilityScoreValue> = self.value.range(..=level).map(|(_, v)| v).collect();
        (!values.is_empty()).then(|| {
            LevelValue::Number(values.iter().flat_map(|v| v.applied.values()).sum())
        })
    }

    pub(super) fn apply(
        &mut self,
        first: Option<u32>,
        level: u32,
        input: Option<&AdvancementInput>,
        ctx: &mut AdvancementContext<'_>,
    ) -> Result<(), AdvancementError> {
        let default_choice = AbilityScoreChoice::default();
        let choice = match input {
            Some(AdvancementInput::AbilityScores(choice)) => choice,
            Some(_) => return Err(AdvancementError::InputMismatch { expected: "ability score" }),
            None if self.is_automatic(first, level) => &default_choice,
            None => return Err(AdvancementError::MissingInput),
        };

        let mut base = ctx.actor.abilities.clone();
        if let Some(previous) = self.value.get(&level) {
            for (ability, delta) in &previous.applied {
                base.add(*ability, -delta);
            }
        }

        let (method, targets) = match &self.configuration.assignment {
            Some(assignment) => {
                let method = self.check_assignment(assignment, choice, ctx.config)?;
                (Some(method), self.assigned_scores(choice, &base, ctx.config)?)
            }
            None => (None, self.improved_scores(choice, &base, ctx.config)?),
        };

        let mut applied = BTreeMap::new();
        for ability in Ability::ALL {
            let delta = targets.get(ability) - base.get(ability);
            if delta != 0 {
                applied.insert(ability, delta);
            }
        }
        ctx.actor.abilities = targets;
        self.value.insert(
            level,
            AbilityScoreValue {
                method,
                rolls: choice.rolls.clone(),
                assignments: choice.assignments.clone(),
                applied,
            },
        );
        Ok(())
    }

    pub(super) fn reverse(
        &mut self,
        level: u32,
        ctx: &mut AdvancementContext<'_>,
    ) -> Result<RetainedData, AdvancementError> {
        let Some(value) = self.value.remove(&level) else {
            return Ok(RetainedData::Nothing);
        };
        for (ability, delta) in &value.applied {
            ctx.actor.abilities.add(*ability, -delta);
        }
        Ok(RetainedData::Choice(AdvancementInput::AbilityScores(
            value.choice(),
        )))
    }

    pub(super) fn restore(
        &mut self,
        first: Option<u32>,
        level: u32,
        retained: &RetainedData,
        ctx: &mut AdvancementContext<'_>,
    ) -> Result<(), AdvancementError> {
        match retained {
            RetainedData::Choice(input @ AdvancementInput::AbilityScores(_)) => {
                self.apply(first, level, Some(input), ctx)
            }
            RetainedData::Nothing => self.apply(first, level, None, ctx),
            _ => Err(AdvancementError::InputMismatch { expected: "ability score" }),
        }
    }

    fn check_assignment(
        &self,
        assignment: &ScoreAssignmentConfig,
        choice: &AbilityScoreChoice,
        config: &SystemConfig,
    ) -> Result<AssignmentMethod, AdvancementError> {
        let method = match (choice.method, assignment.methods.len()) {
            (Some(method), _) => method,
            (None, 1) => assignment
                .methods
                .first()
                .copied()
                .ok_or(AdvancementError::MissingInput)?,
            (None, _) => {
                return Err(AdvancementError::invalid_choice(
                    "pick an assignment method",
                ))
            }
        };
        if !assignment.methods.contains(&method) {
            return Err(AdvancementError::invalid_choice(format!(
                "{:?} is not allowed here",
                method
            )));
        }
        if let Some(missing) = Ability::ALL
            .iter()
            .find(|a| !choice.assignments.contains_key(*a))
        {
            return Err(AdvancementError::invalid_choice(format!(
                "assign a score to {}",
                missing
            )));
        }

        let mut scores: Vec<i32> = choice.assignments.values().copied().collect();
        scores.sort_unstable();
        match method {
            AssignmentMethod::StandardArray => {
                let mut array = self.standard_array(config).to_vec();
                array.sort_unstable();
                if scores != array {
                    return Err(AdvancementError::invalid_choice(
                        "use each standard array score exactly once",
                    ));
                }
            }
            AssignmentMethod::PointBuy => {
                let remaining = self.point_buy_remaining(config, &choice.assignments)?;
                if remaining < 0 {
                    let available = self.point_buy(config).budget as i32;
                    return Err(AdvancementError::PointsExceeded {
                        spent: available - remaining,
                        available,
                    });
                }
            }
            AssignmentMethod::Roll => {
                let formula = self.roll_formula(config)?;
                let mut rolls = choice.rolls.clone();
                rolls.sort_unstable();
                if rolls.len() != Ability::ALL.len()
                    || rolls
                        .iter()
                        .any(|r| *r < formula.min_roll() || *r > formula.max_roll())
                {
                    return Err(AdvancementError::invalid_choice(format!(
                        "roll {} once per ability",
                        formula
                    )));
                }
                if scores != rolls {
                    return Err(AdvancementError::invalid_choice(
                        "assign each rolled score exactly once",
                    ));
                }
            }
        }
        Ok(method)
    }

    fn assigned_scores(
        &self,
        choice: &AbilityScoreChoice,
        base: &AbilityScores,
        config: &SystemConfig,
    ) -> Result<AbilityScores, AdvancementError> {
        let cap = self.cap(config);
        let mut scores = base.clone();
        for ability in Ability::ALL {
            let assigned = choice.assignments.get(&ability).copied().unwrap_or_default();
            let fixed = self.configuration.fixed.get(&ability).copied().unwrap_or(0);
            let score = assigned + fixed;
            if score > cap {
                return Err(AdvancementError::ScoreCapExceeded { ability, cap });
            }
            scores.set(ability, score);
        }
        Ok(scores)
    }

    fn improved_scores(
        &self,
        choice: &AbilityScoreChoice,
        base: &AbilityScores,
        config: &SystemConfig,
    ) -> Result<AbilityScores, AdvancementError> {
        let cap = self.cap(config);
        let mut scores = base.clone();

        for (ability, fixed) in &self.configuration.fixed {
            let current = scores.get(*ability);
            let delta = if *fixed > 0 {
                (*fixed).min((cap - current).max(0))
            } else {
                *fixed
            };
            scores.add(*ability, delta);
        }

        let mut spent = 0;
        for (ability, delta) in &choice.assignments {
            if *delta < 0 {
                return Err(AdvancementError::invalid_choice(format!(
                    "{} cannot be lowered",
                    ability
                )));
            }
            if *delta == 0 {
                continue;
            }
            if self.configuration.locked.contains(ability) {
                return Err(AdvancementError::invalid_choice(format!(
                    "{} cannot be improved by this advancement",
                    ability
                )));
            }
            if scores.get(*ability) + delta > cap {
                return Err(AdvancementError::ScoreCapExceeded {
                    ability: *ability,
                    cap,
                });
            }
            scores.add(*ability, *delta);
            spent += delta;
        }

        let available = self.configuration.points as i32;
        if spent > available {
            return Err(AdvancementError::PointsExceeded { spent, available });
        }
        Ok(scores)
    }
}
