use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{
    AdvancementContext, AdvancementError, AdvancementInput, AdvancementKind, LevelValue,
    RetainedData,
};
use crate::entities::Character;

/// Pick `count` traits out of `pool`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitChoicePool {
    pub count: u32,
    pub pool: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitConfiguration {
    /// Traits granted without a choice.
    #[serde(default)]
    pub grants: BTreeSet<String>,
    #[serde(default)]
    pub choices: Vec<TraitChoicePool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitChoice {
    pub chosen: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitGrant {
    pub chosen: BTreeSet<String>,
    /// Traits this level holds a claim on. A trait the character had
    /// before any grant is never claimed, so reversal leaves it alone; one
    /// claimed by several grants stays until the last of them is reversed.
    pub added: BTreeSet<String>,
}

/// Proficiencies and other keyed traits merged into the character's set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitAdvancement {
    pub configuration: TraitConfiguration,
    #[serde(default)]
    pub value: BTreeMap<u32, TraitGrant>,
}

impl TraitAdvancement {
    pub fn granting<S: Into<String>>(grants: impl IntoIterator<Item = S>) -> Self {
        Self {
            configuration: TraitConfiguration {
                grants: grants.into_iter().map(Into::into).collect(),
                choices: Vec::new(),
            },
            value: BTreeMap::new(),
        }
    }

    pub fn choosing<S: Into<String>>(mut self, count: u32, pool: impl IntoIterator<Item = S>) -> Self {
        self.configuration.choices.push(TraitChoicePool {
            count,
            pool: pool.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub(super) fn is_automatic(&self, _first: Option<u32>, _level: u32) -> bool {
        self.configuration.choices.is_empty()
    }

    /// Comma-separated traits added at or below `level`.
    pub(super) fn value_for_level(&self, level: u32) -> Option<LevelValue> {
        let added: BTreeSet<&str> = self
            .value
            .range(..=level)
            .flat_map(|(_, grant)| grant.added.iter().map(String::as_str))
            .collect();
        (!added.is_empty()).then(|| LevelValue::Text(added.into_iter().collect::<Vec<_>>().join(", ")))
    }

    pub(super) fn apply(
        &mut self,
        _first: Option<u32>,
        level: u32,
        input: Option<&AdvancementInput>,
        ctx: &mut AdvancementContext<'_>,
    ) -> Result<(), AdvancementError> {
        let chosen = if self.configuration.choices.is_empty() {
            BTreeSet::new()
        } else {
            match input {
                Some(AdvancementInput::Trait(choice)) => choice.chosen.clone(),
                Some(_) => return Err(AdvancementError::InputMismatch { expected: "trait" }),
                None => return Err(AdvancementError::MissingInput),
            }
        };
        self.validate_choice(&chosen)?;

        if let Some(previous) = self.value.remove(&level) {
            self.release(&previous, ctx.actor);
        }

        let actor = &*ctx.actor;
        let added: BTreeSet<String> = self
            .configuration
            .grants
            .iter()
            .chain(chosen.iter())
            .filter(|key| !actor.traits.contains(*key) || self.claimed(key, actor))
            .cloned()
            .collect();
        ctx.actor.traits.extend(added.iter().cloned());
        self.value.insert(level, TraitGrant { chosen, added });
        Ok(())
    }

    pub(super) fn reverse(
        &mut self,
        level: u32,
        ctx: &mut AdvancementContext<'_>,
    ) -> Result<RetainedData, AdvancementError> {
        let Some(grant) = self.value.remove(&level) else {
            return Ok(RetainedData::Nothing);
        };
        self.release(&grant, ctx.actor);
        if self.configuration.choices.is_empty() {
            Ok(RetainedData::Nothing)
        } else {
            Ok(RetainedData::Choice(AdvancementInput::Trait(TraitChoice {
                chosen: grant.chosen,
            })))
        }
    }

    pub(super) fn restore(
        &mut self,
        first: Option<u32>,
        level: u32,
        retained: &RetainedData,
        ctx: &mut AdvancementContext<'_>,
    ) -> Result<(), AdvancementError> {
        match retained {
            RetainedData::Choice(input @ AdvancementInput::Trait(_)) => {
                self.apply(first, level, Some(input), ctx)
            }
            RetainedData::Nothing => self.apply(first, level, None, ctx),
            _ => Err(AdvancementError::InputMismatch { expected: "trait" }),
        }
    }

    /// Drop the traits `grant` claimed that no other applied grant still
    /// claims.
    fn release(&self, grant: &TraitGrant, actor: &mut Character) {
        for key in &grant.added {
            if !self.claimed(key, actor) {
                actor.traits.remove(key);
            }
        }
    }

    /// Whether any applied grant other than the running one claims `key`:
    /// another level of this advancement, or a Trait advancement on any
    /// item. The running advancement is off its item while it runs.
    fn claimed(&self, key: &str, actor: &Character) -> bool {
        let own = self.value.values();
        let others = actor
            .items
            .iter()
            .flat_map(|item| &item.advancement)
            .filter_map(|definition| match &definition.kind {
                AdvancementKind::Trait(other) => Some(other.value.values()),
                _ => None,
            })
            .flatten();
        own.chain(others).any(|grant| grant.added.contains(key))
    }

    /// Assign every chosen key to a pool with room left, in pool order.
    fn validate_choice(&self, chosen: &BTreeSet<String>) -> Result<(), AdvancementError> {
        let mut remaining: Vec<u32> = self.configuration.choices.iter().map(|c| c.count).collect();
        for key in chosen {
            let slot = self
                .configuration
                .choices
                .iter()
                .zip(remaining.iter_mut())
                .find(|(pool, left)| **left > 0 && pool.pool.contains(key));
            match slot {
                Some((_, left)) => *left -= 1,
                None => {
                    return Err(AdvancementError::invalid_choice(format!(
                        "{} is not available to choose",
                        key
                    )))
                }
            }
        }
        let missing: u32 = remaining.iter().sum();
        if missing > 0 {
            return Err(AdvancementError::invalid_choice(format!(
                "choose {} more",
                missing
            )));
        }
        Ok(())
    }
}
