use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{AdvancementContext, AdvancementError, AdvancementInput, LevelValue, RetainedData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleType {
    #[default]
    Number,
    Dice,
    String,
}

impl ScaleType {
    fn accepts(&self, value: &LevelValue) -> bool {
        matches!(
            (self, value),
            (ScaleType::Number, LevelValue::Number(_))
                | (ScaleType::Dice, LevelValue::Dice(_))
                | (ScaleType::String, LevelValue::Text(_))
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleValueConfiguration {
    /// Key the value is published under, prefixed by the item identifier.
    pub identifier: String,
    #[serde(default)]
    pub scale_type: ScaleType,
    /// Tiers keyed by the level they start at.
    pub scale: BTreeMap<u32, LevelValue>,
}

/// A value that scales with level, such as Sneak Attack dice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleValueAdvancement {
    pub configuration: ScaleValueConfiguration,
    #[serde(default)]
    pub value: BTreeMap<u32, LevelValue>,
}

impl ScaleValueAdvancement {
    pub fn new(
        identifier: impl Into<String>,
        scale_type: ScaleType,
        scale: impl IntoIterator<Item = (u32, LevelValue)>,
    ) -> Self {
        Self {
            configuration: ScaleValueConfiguration {
                identifier: identifier.into(),
                scale_type,
                scale: scale.into_iter().collect(),
            },
            value: BTreeMap::new(),
        }
    }

    pub fn numbers(identifier: impl Into<String>, scale: impl IntoIterator<Item = (u32, i32)>) -> Self {
        Self::new(
            identifier,
            ScaleType::Number,
            scale.into_iter().map(|(level, n)| (level, LevelValue::Number(n))),
        )
    }

    /// Value of the most recent applied tier at or below `level`.
    pub fn applied_value(&self, level: u32) -> Option<&LevelValue> {
        self.value.range(..=level).next_back().map(|(_, v)| v)
    }

    pub(super) fn is_automatic(&self, _first: Option<u32>, _level: u32) -> bool {
        true
    }

    /// Highest configured tier at or below `level`.
    pub(super) fn value_for_level(&self, level: u32) -> Option<LevelValue> {
        self.configuration
            .scale
            .range(..=level)
            .next_back()
            .map(|(_, v)| v.clone())
    }

    pub(super) fn apply(
        &mut self,
        _first: Option<u32>,
        level: u32,
        _input: Option<&AdvancementInput>,
        _ctx: &mut AdvancementContext<'_>,
    ) -> Result<(), AdvancementError> {
        let entry = self.value_for_level(level).ok_or_else(|| {
            AdvancementError::invalid_configuration(format!(
                "scale {} has no tier at or below level {}",
                self.configuration.identifier, level
            ))
        })?;
        if !self.configuration.scale_type.accepts(&entry) {
            return Err(AdvancementError::invalid_configuration(format!(
                "scale {} mixes value types",
                self.configuration.identifier
            )));
        }
        self.value.insert(level, entry);
        Ok(())
    }

    pub(super) fn reverse(
        &mut self,
        level: u32,
        _ctx: &mut AdvancementContext<'_>,
    ) -> Result<RetainedData, AdvancementError> {
        self.value.remove(&level);
        Ok(RetainedData::Nothing)
    }

    pub(super) fn restore(
        &mut self,
        first: Option<u32>,
        level: u32,
        _retained: &RetainedData,
        ctx: &mut AdvancementContext<'_>,
    ) -> Result<(), AdvancementError> {
        self.apply(first, level, None, ctx)
    }
}
