use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{AdvancementContext, AdvancementError, AdvancementInput, LevelValue, RetainedData};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefenseConfiguration {
    /// Defense bonus granted at each level.
    pub bonuses: BTreeMap<u32, i32>,
}

/// Flat Defense bonuses merged into derived Defense.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefenseAdvancement {
    pub configuration: DefenseConfiguration,
    #[serde(default)]
    pub value: BTreeMap<u32, i32>,
}

impl DefenseAdvancement {
    pub fn with_bonuses(bonuses: impl IntoIterator<Item = (u32, i32)>) -> Self {
        Self {
            configuration: DefenseConfiguration {
                bonuses: bonuses.into_iter().collect(),
            },
            value: BTreeMap::new(),
        }
    }

    /// Sum of applied bonuses.
    pub fn applied_bonus(&self) -> i32 {
        self.value.values().sum()
    }

    pub(super) fn is_automatic(&self, _first: Option<u32>, _level: u32) -> bool {
        true
    }

    pub(super) fn value_for_level(&self, level: u32) -> Option<LevelValue> {
        let bonus: i32 = self
            .configuration
            .bonuses
            .range(..=level)
            .map(|(_, bonus)| *bonus)
            .sum();
        Some(LevelValue::Number(bonus))
    }

    pub(super) fn apply(
        &mut self,
        _first: Option<u32>,
        level: u32,
        _input: Option<&AdvancementInput>,
        _ctx: &mut AdvancementContext<'_>,
    ) -> Result<(), AdvancementError> {
        let bonus = self.configuration.bonuses.get(&level).copied().ok_or_else(|| {
            AdvancementError::invalid_configuration(format!("no defense bonus for level {}", level))
        })?;
        self.value.insert(level, bonus);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advancement::test_support::Harness;
    use crate::advancement::{AdvancementDefinition, AdvancementKind};
    use crate::entities::{Character, Item, ItemKind};
    use crate::value_objects::{Ability, AbilityScores};

    #[test]
    fn bonuses_feed_derived_defense() {
        let definition = AdvancementDefinition::new(
            AdvancementKind::Defense(DefenseAdvancement::with_bonuses([(1, 1), (5, 1)])),
            [1, 5],
        );
        let id = definition.id;
        assert_eq!(definition.value_for_level(4), Some(LevelValue::Number(1)));
        assert_eq!(definition.value_for_level(5), Some(LevelValue::Number(2)));
        assert!(definition.is_automatic(5));

        let item = Item::new("Brawler", ItemKind::Class).with_advancement(definition);
        let item_id = item.id;
        let actor = Character::new("Riley")
            .with_abilities(AbilityScores::uniform(10).with(Ability::Dex, 16))
            .with_item(item);
        let mut harness = Harness::new(actor, item_id);
        assert_eq!(harness.derived().defense, 13);

        harness.apply(id, 1, None).unwrap();
        harness.apply(id, 5, None).unwrap();
        assert_eq!(harness.derived().defense, 15);

        let before = harness.derived();
        let retained = harness.reverse(id, 5);
        assert_eq!(harness.derived().defense, 14);
        harness.restore(id, 5, &retained).unwrap();
        assert_eq!(harness.derived(), before);
    }

    #[test]
    fn missing_bonus_is_a_configuration_error() {
        let definition = AdvancementDefinition::new(
            AdvancementKind::Defense(DefenseAdvancement::with_bonuses([(1, 1)])),
            [1, 2],
        );
        let id = definition.id;
        let item = Item::new("Brawler", ItemKind::Class).with_advancement(definition);
        let item_id = item.id;
        let mut harness = Harness::new(Character::new("Riley").with_item(item), item_id);
        assert!(matches!(
            harness.apply(id, 2, None),
            Err(AdvancementError::InvalidConfiguration(_))
        ));
    }
}
