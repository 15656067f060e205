//! Derived character data.
//!
//! [`derive_character`] is a pure function of the raw character and the
//! ruleset. It runs a fixed, ordered list of stages; later stages may read
//! what earlier ones wrote (hit points need ability modifiers, resources
//! may track scale values).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::advancement::{AdvancementKind, LevelValue};
use crate::entities::Character;
use crate::value_objects::{Ability, SystemConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedHitPoints {
    pub max: i32,
    pub value: i32,
    pub temp: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedResource {
    pub max: i32,
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedCharacter {
    pub level: u32,
    pub proficiency_bonus: i32,
    pub ability_modifiers: BTreeMap<Ability, i32>,
    /// Applied scale values keyed `item_identifier.scale_identifier`.
    pub scale_values: BTreeMap<String, LevelValue>,
    pub hit_points: DerivedHitPoints,
    pub defense: i32,
    pub resources: BTreeMap<String, DerivedResource>,
    pub traits: BTreeSet<String>,
}

type Stage = fn(&Character, &SystemConfig, &mut DerivedCharacter);

const PIPELINE: [Stage; 7] = [
    ability_modifiers,
    proficiency,
    scale_values,
    hit_points,
    defense,
    resources,
    traits,
];

pub fn derive_character(character: &Character, config: &SystemConfig) -> DerivedCharacter {
    let mut derived = DerivedCharacter {
        level: character.level,
        ..Default::default()
    };
    for stage in PIPELINE {
        stage(character, config, &mut derived);
    }
    derived
}

fn ability_modifiers(character: &Character, _: &SystemConfig, derived: &mut DerivedCharacter) {
    derived.ability_modifiers = Ability::ALL
        .iter()
        .map(|a| (*a, character.abilities.modifier(*a)))
        .collect();
}

fn proficiency(character: &Character, config: &SystemConfig, derived: &mut DerivedCharacter) {
    derived.proficiency_bonus = config.proficiency_bonus(character.level.max(1));
}

fn scale_values(character: &Character, _: &SystemConfig, derived: &mut DerivedCharacter) {
    for item in &character.items {
        for definition in &item.advancement {
            if let AdvancementKind::ScaleValue(scale) = &definition.kind {
                if let Some(value) = scale.applied_value(character.level) {
                    let key = format!("{}.{}", item.identifier, scale.configuration.identifier);
                    derived.scale_values.insert(key, value.clone());
                }
            }
        }
    }
}

/// Sum of hit point gains, plus the constitution modifier once per gain.
fn hit_points(character: &Character, _: &SystemConfig, derived: &mut DerivedCharacter) {
    let con = derived
        .ability_modifiers
        .get(&Ability::Con)
        .copied()
        .unwrap_or(0);
    let mut max = 0;
    for definition in character.items.iter().flat_map(|i| &i.advancement) {
        if let AdvancementKind::HitPoints(hp) = &definition.kind {
            for gain in hp.value.values() {
                max += (gain + con).max(1);
            }
        }
    }
    derived.hit_points = DerivedHitPoints {
        max,
        value: (max - character.hit_points.damage).clamp(0, max.max(0)),
        temp: character.hit_points.temp,
    };
}

fn defense(character: &Character, config: &SystemConfig, derived: &mut DerivedCharacter) {
    let dex = derived
        .ability_modifiers
        .get(&Ability::Dex)
        .copied()
        .unwrap_or(0);
    let bonus: i32 = character
        .items
        .iter()
        .flat_map(|i| &i.advancement)
        .filter_map(|d| match &d.kind {
            AdvancementKind::Defense(defense) => Some(defense.applied_bonus()),
            _ => None,
        })
        .sum();
    derived.defense = config.base_defense + dex + bonus;
}

fn resources(character: &Character, _: &SystemConfig, derived: &mut DerivedCharacter) {
    derived.resources = character
        .resources
        .iter()
        .map(|(key, pool)| {
            (
                key.clone(),
                DerivedResource {
                    max: pool.max,
                    value: pool.value(),
                },
            )
        })
        .collect();
}

fn traits(character: &Character, _: &SystemConfig, derived: &mut DerivedCharacter) {
    derived.traits = character.traits.clone();
}
