use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{AdvancementContext, AdvancementError, AdvancementInput, LevelValue, RetainedData};
use crate::value_objects::{DiceFormula, DiceParseError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitPointsConfiguration {
    /// Hit die size, e.g. 10 for d10.
    pub denomination: u8,
    /// Gain at the advancement's first level. Defaults to the die maximum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<i32>,
    /// Fixed gain at later levels. Defaults to the die average.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_level: Option<i32>,
    /// Whether later levels may be rolled instead of taking the fixed gain.
    #[serde(default)]
    pub allow_roll: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitPointsChoice {
    /// Rolled result; `None` takes the fixed gain.
    #[serde(default)]
    pub rolled: Option<i32>,
}

/// Hit points gained per level. Values are the raw gains; the constitution
/// modifier is added when hit points are derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitPointsAdvancement {
    pub configuration: HitPointsConfiguration,
    #[serde(default)]
    pub value: BTreeMap<u32, i32>,
}

impl HitPointsAdvancement {
    pub fn with_denomination(denomination: u8) -> Self {
        Self {
            configuration: HitPointsConfiguration {
                denomination,
                base: None,
                per_level: None,
                allow_roll: false,
            },
            value: BTreeMap::new(),
        }
    }

    pub fn allowing_rolls(mut self) -> Self {
        self.configuration.allow_roll = true;
        self
    }

    pub fn die(&self) -> Result<DiceFormula, DiceParseError> {
        DiceFormula::single(self.configuration.denomination)
    }

    pub fn base(&self) -> i32 {
        self.configuration
            .base
            .unwrap_or(self.configuration.denomination as i32)
    }

    pub fn per_level(&self) -> Result<i32, DiceParseError> {
        match self.configuration.per_level {
            Some(fixed) => Ok(fixed),
            None => Ok(self.die()?.average()),
        }
    }

    /// Roll the hit die for a flow offering the roll option.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<i32, DiceParseError> {
        Ok(self.die()?.roll(rng).total)
    }

    pub(super) fn is_automatic(&self, first: Option<u32>, level: u32) -> bool {
        !self.configuration.allow_roll || first == Some(level)
    }

    /// Total hit point gain recorded at or below `level`.
    pub(super) fn value_for_level(&self, level: u32) -> Option<LevelValue> {
        let gains: Vec<i32> = self.value.range(..=level).map(|(_, gain)| *gain).collect();
        (!gains.is_empty()).then(|| LevelValue::Number(gains.iter().sum()))
    }

    pub(super) fn apply(
        &mut self,
        first: Option<u32>,
        level: u32,
        input: Option<&AdvancementInput>,
        _ctx: &mut AdvancementContext<'_>,
    ) -> Result<(), AdvancementError> {
        let gain = if first == Some(level) {
            self.base()
        } else if self.is_automatic(first, level) {
            self.per_level()?
        } else {
            let choice = match input {
                Some(AdvancementInput::HitPoints(choice)) => choice,
                Some(_) => return Err(AdvancementError::InputMismatch { expected: "hit points" }),
                None => return Err(AdvancementError::MissingInput),
            };
            match choice.rolled {
                Some(rolled) => self.check_roll(rolled)?,
                None => self.per_level()?,
            }
        };
        if gain < 1 {
            return Err(AdvancementError::invalid_configuration(
                "hit point gain must be at least 1",
            ));
        }
        self.value.insert(level, gain);
        Ok(())
    }

    pub(super) fn reverse(
        &mut self,
        level: u32,
        _ctx: &mut AdvancementContext<'_>,
    ) -> Result<RetainedData, AdvancementError> {
        Ok(match self.value.remove(&level) {
            Some(gain) => RetainedData::Choice(AdvancementInput::HitPoints(HitPointsChoice {
                rolled: Some(gain),
            })),
            None => RetainedData::Nothing,
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
            RetainedData::Choice(AdvancementInput::HitPoints(HitPointsChoice {
                rolled: Some(gain),
            })) if *gain >= 1 => {
                self.value.insert(level, *gain);
                Ok(())
            }
            RetainedData::Nothing => self.apply(first, level, None, ctx),
            _ => Err(AdvancementError::InputMismatch { expected: "hit points" }),
        }
    }

    fn check_roll(&self, rolled: i32) -> Result<i32, AdvancementError> {
        let max = self.configuration.denomination as i32;
        if (1..=max).contains(&rolled) {
            Ok(rolled)
        } else {
            Err(AdvancementError::invalid_choice(format!(
                "a d{} roll must be between 1 and {}",
                max, max
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advancement::test_support::Harness;
    use crate::advancement::{AdvancementDefinition, AdvancementKind};
    use crate::entities::{Character, Item, ItemKind};
    use crate::ids::AdvancementId;
    use crate::value_objects::{Ability, AbilityScores};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup(hp: HitPointsAdvancement) -> (Harness, AdvancementId) {
        let definition = AdvancementDefinition::new(AdvancementKind::HitPoints(hp), 1..=10);
        let id = definition.id;
        let item = Item::new("Strong Hero", ItemKind::Archetype).with_advancement(definition);
        let item_id = item.id;
        let actor = Character::new("Riley")
            .with_abilities(AbilityScores::uniform(10).with(Ability::Con, 14))
            .with_item(item);
        (Harness::new(actor, item_id), id)
    }

    #[test]
    fn first_level_takes_base_then_average() {
        let (mut harness, id) = setup(HitPointsAdvancement::with_denomination(10));
        harness.apply(id, 1, None).unwrap();
        harness.apply(id, 2, None).unwrap();
        assert_eq!(
            harness.definition(id).value_for_level(2),
            Some(LevelValue::Number(16))
        );
        // 10 + 6 from the die, plus +2 constitution for each of two levels
        assert_eq!(harness.derived().hit_points.max, 20);
    }

    #[test]
    fn rolled_levels_need_input_and_a_legal_roll() {
        let (mut harness, id) = setup(HitPointsAdvancement::with_denomination(8).allowing_rolls());
        assert!(harness.definition(id).is_automatic(1));
        assert!(!harness.definition(id).is_automatic(2));
        harness.apply(id, 1, None).unwrap();

        assert_eq!(harness.apply(id, 2, None), Err(AdvancementError::MissingInput));
        let too_high = AdvancementInput::HitPoints(HitPointsChoice { rolled: Some(9) });
        assert!(matches!(
            harness.apply(id, 2, Some(&too_high)),
            Err(AdvancementError::InvalidChoice(_))
        ));
        let rolled = AdvancementInput::HitPoints(HitPointsChoice { rolled: Some(3) });
        harness.apply(id, 2, Some(&rolled)).unwrap();
        assert_eq!(harness.definition(id).value_for_level(2), Some(LevelValue::Number(11)));
    }

    #[test]
    fn apply_twice_records_the_same_value() {
        let (mut harness, id) = setup(HitPointsAdvancement::with_denomination(8).allowing_rolls());
        harness.apply(id, 1, None).unwrap();
        let rolled = AdvancementInput::HitPoints(HitPointsChoice { rolled: Some(6) });
        harness.apply(id, 2, Some(&rolled)).unwrap();
        let first = harness.definition(id).clone();
        harness.apply(id, 2, Some(&rolled)).unwrap();
        assert_eq!(harness.definition(id), &first);
    }

    #[test]
    fn reverse_then_restore_keeps_the_roll() {
        let (mut harness, id) = setup(HitPointsAdvancement::with_denomination(8).allowing_rolls());
        harness.apply(id, 1, None).unwrap();
        let rolled = AdvancementInput::HitPoints(HitPointsChoice { rolled: Some(2) });
        harness.apply(id, 2, Some(&rolled)).unwrap();
        let before = harness.derived();

        let retained = harness.reverse(id, 2);
        assert!(!harness.definition(id).is_applied(2));
        assert_eq!(harness.derived().hit_points.max, 10);

        harness.restore(id, 2, &retained).unwrap();
        assert_eq!(harness.derived(), before);
    }

    #[test]
    fn roll_stays_on_the_die() {
        let hp = HitPointsAdvancement::with_denomination(6);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let rolled = hp.roll(&mut rng).unwrap();
            assert!((1..=6).contains(&rolled));
        }
    }
}
