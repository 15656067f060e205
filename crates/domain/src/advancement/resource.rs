use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    AdvancementContext, AdvancementError, AdvancementInput, AdvancementKind, LevelValue,
    RetainedData,
};
use crate::entities::{RecoveryPeriod, ResourcePool};
use crate::value_objects::DiceFormula;

/// How much a resource grows each time the advancement applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceAmount {
    Fixed { amount: i32 },
    /// Track a numeric scale value published as `item.scale`; each level
    /// adds whatever the scale has grown since the previous grant.
    Scale { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfiguration {
    pub identifier: String,
    pub label: String,
    #[serde(default)]
    pub recovery: RecoveryPeriod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    pub amount: ResourceAmount,
}

/// What one level added to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGrant {
    pub amount: i32,
    /// The pool did not exist before this level.
    pub created: bool,
}

/// Grants or enlarges a named resource pool such as Focus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAdvancement {
    pub configuration: ResourceConfiguration,
    #[serde(default)]
    pub value: BTreeMap<u32, ResourceGrant>,
}

impl ResourceAdvancement {
    pub fn new(identifier: impl Into<String>, label: impl Into<String>, amount: ResourceAmount) -> Self {
        Self {
            configuration: ResourceConfiguration {
                identifier: identifier.into(),
                label: label.into(),
                recovery: RecoveryPeriod::default(),
                formula: None,
                amount,
            },
            value: BTreeMap::new(),
        }
    }

    pub fn recovering(mut self, recovery: RecoveryPeriod, formula: Option<&str>) -> Self {
        self.configuration.recovery = recovery;
        self.configuration.formula = formula.map(str::to_string);
        self
    }

    pub(super) fn is_automatic(&self, _first: Option<u32>, _level: u32) -> bool {
        true
    }

    /// Total granted at or below `level`.
    pub(super) fn value_for_level(&self, level: u32) -> Option<LevelValue> {
        let grants: Vec<i32> = self.value.range(..=level).map(|(_, g)| g.amount).collect();
        (!grants.is_empty()).then(|| LevelValue::Number(grants.iter().sum()))
    }

    pub(super) fn apply(
        &mut self,
        _first: Option<u32>,
        level: u32,
        _input: Option<&AdvancementInput>,
        ctx: &mut AdvancementContext<'_>,
    ) -> Result<(), AdvancementError> {
        if let Some(formula) = &self.configuration.formula {
            DiceFormula::parse(formula)?;
        }
        if self.value.contains_key(&level) {
            self.reverse(level, ctx)?;
        }

        let amount = match &self.configuration.amount {
            ResourceAmount::Fixed { amount } => *amount,
            ResourceAmount::Scale { key } => {
                let scale = ctx.derived.scale_values.get(key).ok_or_else(|| {
                    AdvancementError::missing_prerequisite(format!("scale value {}", key))
                })?;
                let target = scale.as_number().ok_or_else(|| {
                    AdvancementError::invalid_configuration(format!(
                        "scale value {} is not a number",
                        key
                    ))
                })?;
                let granted: i32 = self.value.values().map(|g| g.amount).sum();
                (target - granted).max(0)
            }
        };

        self.add_to_pool(level, amount, None, ctx);
        Ok(())
    }

    /// Take back this level's share of the pool. The pool itself goes only
    /// when no other applied grant still feeds it.
    pub(super) fn reverse(
        &mut self,
        level: u32,
        ctx: &mut AdvancementContext<'_>,
    ) -> Result<RetainedData, AdvancementError> {
        let Some(grant) = self.value.remove(&level) else {
            return Ok(RetainedData::Nothing);
        };
        let identifier = &self.configuration.identifier;
        if let Some(pool) = ctx.actor.resources.get_mut(identifier) {
            pool.max -= grant.amount;
        }
        let pool = if self.value.is_empty() && !fed_elsewhere(ctx, identifier) {
            ctx.actor.resources.remove(identifier)
        } else {
            None
        };
        Ok(RetainedData::Resource {
            amount: grant.amount,
            pool,
        })
    }

    pub(super) fn restore(
        &mut self,
        first: Option<u32>,
        level: u32,
        retained: &RetainedData,
        ctx: &mut AdvancementContext<'_>,
    ) -> Result<(), AdvancementError> {
        match retained {
            RetainedData::Resource { amount, pool } => {
                if self.value.contains_key(&level) {
                    self.reverse(level, ctx)?;
                }
                self.add_to_pool(level, *amount, pool.clone(), ctx);
                Ok(())
            }
            RetainedData::Nothing => self.apply(first, level, None, ctx),
            _ => Err(AdvancementError::InputMismatch { expected: "resource" }),
        }
    }

    /// Grow the pool by `amount`, creating it from `removed` (the pool a
    /// reversal took away) or from configuration when it does not exist.
    fn add_to_pool(
        &mut self,
        level: u32,
        amount: i32,
        removed: Option<ResourcePool>,
        ctx: &mut AdvancementContext<'_>,
    ) {
        let config = &self.configuration;
        let created = !ctx.actor.resources.contains_key(&config.identifier);
        let pool = ctx
            .actor
            .resources
            .entry(config.identifier.clone())
            .or_insert_with(|| {
                removed.unwrap_or_else(|| ResourcePool {
                    identifier: config.identifier.clone(),
                    label: config.label.clone(),
                    max: 0,
                    spent: 0,
                    recovery: config.recovery,
                    formula: config.formula.clone(),
                })
            });
        pool.max += amount;
        self.value.insert(level, ResourceGrant { amount, created });
    }
}

/// Whether another applied Resource advancement on the character grants
/// into `identifier`. The running advancement is not on its item while it
/// runs, so it never counts itself.
fn fed_elsewhere(ctx: &AdvancementContext<'_>, identifier: &str) -> bool {
    ctx.actor
        .items
        .iter()
        .flat_map(|item| &item.advancement)
        .any(|definition| match &definition.kind {
            AdvancementKind::Resource(other) => {
                other.configuration.identifier == identifier && !other.value.is_empty()
            }
            _ => false,
        })
}
