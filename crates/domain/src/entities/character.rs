//! Character entity - the document advancements are applied to.
//!
//! Maximum hit points, defense and proficiency are not stored here; they are
//! computed by [`derive_character`](crate::derived::derive_character) from
//! the raw state below.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::item::Item;
use crate::advancement::AdvancementDefinition;
use crate::error::DomainError;
use crate::ids::{AdvancementId, CharacterId, ItemId};
use crate::value_objects::AbilityScores;

/// Damage and temporary hit points. The maximum is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitPointState {
    #[serde(default)]
    pub damage: i32,
    #[serde(default)]
    pub temp: i32,
}

/// When a resource pool refills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPeriod {
    ShortRest,
    #[default]
    LongRest,
    Never,
}

/// A named, spendable pool such as Focus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePool {
    pub identifier: String,
    pub label: String,
    pub max: i32,
    #[serde(default)]
    pub spent: i32,
    #[serde(default)]
    pub recovery: RecoveryPeriod,
    /// Dice formula rolled on recovery, when recovery is partial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

impl ResourcePool {
    pub fn value(&self) -> i32 {
        (self.max - self.spent).max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub level: u32,
    #[serde(default)]
    pub abilities: AbilityScores,
    #[serde(default)]
    pub hit_points: HitPointState,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourcePool>,
    #[serde(default)]
    pub traits: BTreeSet<String>,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            level: 1,
            abilities: AbilityScores::uniform(10),
            hit_points: HitPointState::default(),
            resources: BTreeMap::new(),
            traits: BTreeSet::new(),
            items: Vec::new(),
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_abilities(mut self, abilities: AbilityScores) -> Self {
        self.abilities = abilities;
        self
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    pub fn item_index(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }

    /// Remove an item, returning it with the position it held.
    pub fn remove_item(&mut self, id: ItemId) -> Option<(usize, Item)> {
        let index = self.item_index(id)?;
        Some((index, self.items.remove(index)))
    }

    /// Insert an item at a position, clamped to the end of the list.
    pub fn insert_item(&mut self, index: usize, item: Item) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    /// Run `f` with mutable access to both an advancement and the character
    /// that owns it.
    ///
    /// The definition is taken out of its item for the duration of the call
    /// so `f` may add or remove other items; it is put back at its original
    /// position afterwards.
    pub fn with_advancement<T>(
        &mut self,
        item_id: ItemId,
        advancement_id: AdvancementId,
        f: impl FnOnce(&mut AdvancementDefinition, &mut Character) -> T,
    ) -> Result<T, DomainError> {
        let item = self
            .item_mut(item_id)
            .ok_or_else(|| DomainError::not_found("Item", item_id.to_string()))?;
        let (index, mut definition) = item
            .remove_advancement(advancement_id)
            .ok_or_else(|| DomainError::not_found("Advancement", advancement_id.to_string()))?;

        let result = f(&mut definition, self);

        let item = self
            .item_mut(item_id)
            .ok_or_else(|| DomainError::not_found("Item", item_id.to_string()))?;
        let index = index.min(item.advancement.len());
        item.advancement.insert(index, definition);
        Ok(result)
    }
}

/// Top-level field changes between two versions of a character.
///
/// Items are not part of the patch; they are committed as child
/// create/update/delete sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abilities: Option<AbilityScores>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_points: Option<HitPointState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<BTreeMap<String, ResourcePool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traits: Option<BTreeSet<String>>,
}

impl CharacterPatch {
    /// Fields of `updated` that differ from `original`.
    pub fn diff(original: &Character, updated: &Character) -> Self {
        fn changed<T: PartialEq + Clone>(a: &T, b: &T) -> Option<T> {
            (a != b).then(|| b.clone())
        }
        Self {
            name: changed(&original.name, &updated.name),
            level: changed(&original.level, &updated.level),
            abilities: changed(&original.abilities, &updated.abilities),
            hit_points: changed(&original.hit_points, &updated.hit_points),
            resources: changed(&original.resources, &updated.resources),
            traits: changed(&original.traits, &updated.traits),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, character: &mut Character) {
        if let Some(name) = &self.name {
            character.name = name.clone();
        }
        if let Some(level) = self.level {
            character.level = level;
        }
        if let Some(abilities) = &self.abilities {
            character.abilities = abilities.clone();
        }
        if let Some(hit_points) = self.hit_points {
            character.hit_points = hit_points;
        }
        if let Some(resources) = &self.resources {
            character.resources = resources.clone();
        }
        if let Some(traits) = &self.traits {
            character.traits = traits.clone();
        }
    }
}
