//! Item entity - things a character owns, including the concept items
//! (archetype, class, background, profession) that carry advancements.
//!
//! Items are children of a character document. The `advancement` array is
//! the persisted store of truth for every advancement definition on the
//! item and its applied values; [`AdvancementCollection`] is only a read
//! view over it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::advancement::{AdvancementCollection, AdvancementDefinition};
use crate::common::{slugify, some_if_not_empty};
use crate::error::DomainError;
use crate::ids::{AdvancementId, ItemId};

/// Kind of item. Concept kinds drive a character's leveling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Archetype,
    Class,
    Background,
    Profession,
    Feat,
    Talent,
    Equipment,
    Other,
}

impl ItemKind {
    pub fn is_concept(&self) -> bool {
        matches!(
            self,
            ItemKind::Archetype | ItemKind::Class | ItemKind::Background | ItemKind::Profession
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Archetype => "archetype",
            ItemKind::Class => "class",
            ItemKind::Background => "background",
            ItemKind::Profession => "profession",
            ItemKind::Feat => "feat",
            ItemKind::Talent => "talent",
            ItemKind::Equipment => "equipment",
            ItemKind::Other => "other",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which advancement created an item, and at what level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantOrigin {
    pub item_id: ItemId,
    pub advancement_id: AdvancementId,
    pub level: u32,
}

/// An item embedded in a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub kind: ItemKind,
    /// Stable slug used to key scale values and grants.
    pub identifier: String,
    /// Reference to the template this item was copied from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granted_by: Option<GrantOrigin>,
    #[serde(default)]
    pub advancement: Vec<AdvancementDefinition>,
}

impl Item {
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        let name = name.into();
        Self {
            id: ItemId::new(),
            identifier: slugify(&name),
            name,
            kind,
            source: None,
            granted_by: None,
            advancement: Vec::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = some_if_not_empty(source.into());
        self
    }

    /// Builder form of [`Item::add_advancement`] for authoring fixtures.
    pub fn with_advancement(mut self, advancement: AdvancementDefinition) -> Self {
        self.advancement.push(advancement);
        self
    }

    pub fn advancement_collection(&self) -> AdvancementCollection<'_> {
        AdvancementCollection::new(&self.advancement)
    }

    pub fn advancement(&self, id: AdvancementId) -> Option<&AdvancementDefinition> {
        self.advancement.iter().find(|a| a.id == id)
    }

    pub fn advancement_mut(&mut self, id: AdvancementId) -> Option<&mut AdvancementDefinition> {
        self.advancement.iter_mut().find(|a| a.id == id)
    }

    /// Append a new advancement definition to this item.
    pub fn add_advancement(&mut self, advancement: AdvancementDefinition) -> Result<(), DomainError> {
        if self.advancement(advancement.id).is_some() {
            return Err(DomainError::constraint(format!(
                "Advancement {} already exists on item {}",
                advancement.id, self.name
            )));
        }
        advancement.validate()?;
        self.advancement.push(advancement);
        Ok(())
    }

    /// Remove an advancement definition, returning it with its former position.
    pub fn remove_advancement(&mut self, id: AdvancementId) -> Option<(usize, AdvancementDefinition)> {
        let index = self.advancement.iter().position(|a| a.id == id)?;
        Some((index, self.advancement.remove(index)))
    }

    /// Whether any advancement on this item has been applied at some level.
    pub fn has_advancement_history(&self) -> bool {
        self.advancement.iter().any(|a| a.has_history())
    }

    /// Key a grant uses to recognise copies of this item.
    pub fn grant_key(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.identifier)
    }

    /// Forget every level applied on another character, as for an item
    /// copied in from elsewhere.
    pub fn clear_advancement_values(&mut self) {
        for definition in &mut self.advancement {
            definition.clear_values();
        }
    }

    /// Fresh embedded copy of a template item, recording where it came from.
    pub fn instantiate(&self, origin: GrantOrigin) -> Item {
        let mut item = Item {
            id: ItemId::new(),
            name: self.name.clone(),
            kind: self.kind,
            identifier: self.identifier.clone(),
            source: Some(self.grant_key().to_string()),
            granted_by: Some(origin),
            advancement: self.advancement.clone(),
        };
        item.clear_advancement_values();
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advancement::{AdvancementKind, DefenseAdvancement};

    fn defense(levels: &[u32]) -> AdvancementDefinition {
        AdvancementDefinition::new(
            AdvancementKind::Defense(DefenseAdvancement::with_bonuses(
                levels.iter().map(|l| (*l, 1)),
            )),
            levels.iter().copied(),
        )
    }

    #[test]
    fn new_item_slugs_its_name() {
        let item = Item::new("Strong Hero", ItemKind::Archetype);
        assert_eq!(item.identifier, "strong-hero");
        assert!(item.kind.is_concept());
        assert!(!ItemKind::Feat.is_concept());
        assert_eq!(item.grant_key(), "strong-hero");
    }

    #[test]
    fn add_advancement_rejects_duplicate_ids() {
        let mut item = Item::new("Brawler", ItemKind::Class);
        let definition = defense(&[1]);
        item.add_advancement(definition.clone()).unwrap();
        let err = item.add_advancement(definition).unwrap_err();
        assert!(matches!(err, DomainError::Constraint(_)));
    }

    #[test]
    fn add_advancement_rejects_missing_levels() {
        let mut item = Item::new("Brawler", ItemKind::Class);
        let err = item.add_advancement(defense(&[])).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        let err = item.add_advancement(defense(&[0])).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn remove_advancement_reports_position() {
        let first = defense(&[1]);
        let second = defense(&[2]);
        let mut item = Item::new("Brawler", ItemKind::Class)
            .with_advancement(first)
            .with_advancement(second.clone());
        let (index, removed) = item.remove_advancement(second.id).unwrap();
        assert_eq!(index, 1);
        assert_eq!(removed.id, second.id);
        assert!(item.remove_advancement(second.id).is_none());
    }

    #[test]
    fn instantiate_copies_template_with_origin() {
        let template = Item::new("Pistol", ItemKind::Equipment).with_source("compendium.pistol");
        let origin = GrantOrigin {
            item_id: ItemId::new(),
            advancement_id: AdvancementId::new(),
            level: 2,
        };
        let copy = template.instantiate(origin);
        assert_ne!(copy.id, template.id);
        assert_eq!(copy.grant_key(), "compendium.pistol");
        assert_eq!(copy.granted_by, Some(origin));
    }

    #[test]
    fn empty_source_is_ignored() {
        let item = Item::new("Pistol", ItemKind::Equipment).with_source("");
        assert_eq!(item.source, None);
    }
}
