use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{
    AdvancementContext, AdvancementError, AdvancementInput, LevelValue, RetainedData, RetainedItem,
};
use crate::entities::{GrantOrigin, Item};
use crate::ids::ItemId;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemGrantConfiguration {
    /// Templates copied onto the character.
    pub items: Vec<Item>,
    /// The player may decline any of the items.
    #[serde(default)]
    pub optional: bool,
    /// Grant only this many of the templates, picked by the player.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choose: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemGrantChoice {
    /// Grant keys of the selected templates.
    pub selected: BTreeSet<String>,
}

/// Embeds copies of template items on the character.
///
/// The value records, per level, which created item id belongs to which
/// template key, so reversal removes exactly those items.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemGrantAdvancement {
    pub configuration: ItemGrantConfiguration,
    #[serde(default)]
    pub value: BTreeMap<u32, BTreeMap<String, ItemId>>,
}

impl ItemGrantAdvancement {
    pub fn granting(items: impl IntoIterator<Item = Item>) -> Self {
        Self {
            configuration: ItemGrantConfiguration {
                items: items.into_iter().collect(),
                optional: false,
                choose: None,
            },
            value: BTreeMap::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.configuration.optional = true;
        self
    }

    pub fn choose(mut self, count: u32) -> Self {
        self.configuration.choose = Some(count);
        self
    }

    pub(super) fn is_automatic(&self, _first: Option<u32>, _level: u32) -> bool {
        !self.configuration.optional && self.configuration.choose.is_none()
    }

    /// Number of items granted at or below `level`.
    pub(super) fn value_for_level(&self, level: u32) -> Option<LevelValue> {
        let count: usize = self.value.range(..=level).map(|(_, g)| g.len()).sum();
        (count > 0).then(|| LevelValue::Number(count as i32))
    }

    pub(super) fn apply(
        &mut self,
        _first: Option<u32>,
        level: u32,
        input: Option<&AdvancementInput>,
        ctx: &mut AdvancementContext<'_>,
    ) -> Result<(), AdvancementError> {
        let selected = self.selection(level, input)?;
        let existing = self.value.remove(&level).unwrap_or_default();

        for (key, id) in &existing {
            if !selected.contains(key) {
                ctx.actor.remove_item(*id);
            }
        }

        let origin = GrantOrigin {
            item_id: ctx.item_id,
            advancement_id: ctx.advancement_id,
            level,
        };
        let mut granted = BTreeMap::new();
        for template in &self.configuration.items {
            let key = template.grant_key();
            if !selected.contains(key) {
                continue;
            }
            let id = match existing.get(key) {
                Some(id) if ctx.actor.item(*id).is_some() => *id,
                _ => {
                    let copy = template.instantiate(origin);
                    let id = copy.id;
                    ctx.actor.items.push(copy);
                    id
                }
            };
            granted.insert(key.to_string(), id);
        }
        self.value.insert(level, granted);
        Ok(())
    }

    pub(super) fn reverse(
        &mut self,
        level: u32,
        ctx: &mut AdvancementContext<'_>,
    ) -> Result<RetainedData, AdvancementError> {
        let Some(granted) = self.value.remove(&level) else {
            return Ok(RetainedData::Nothing);
        };
        let ids: BTreeSet<ItemId> = granted.values().copied().collect();
        let positions: Vec<usize> = ctx
            .actor
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| ids.contains(&item.id))
            .map(|(index, _)| index)
            .collect();

        let mut retained = Vec::with_capacity(positions.len());
        for index in positions.into_iter().rev() {
            let item = ctx.actor.items.remove(index);
            retained.push(RetainedItem { index, item });
        }
        retained.reverse();
        Ok(RetainedData::Items(retained))
    }

    pub(super) fn restore(
        &mut self,
        first: Option<u32>,
        level: u32,
        retained: &RetainedData,
        ctx: &mut AdvancementContext<'_>,
    ) -> Result<(), AdvancementError> {
        match retained {
            RetainedData::Items(items) => {
                let mut granted = BTreeMap::new();
                for RetainedItem { index, item } in items {
                    granted.insert(item.grant_key().to_string(), item.id);
                    ctx.actor.insert_item(*index, item.clone());
                }
                self.value.insert(level, granted);
                Ok(())
            }
            RetainedData::Nothing if self.is_automatic(first, level) => {
                self.apply(first, level, None, ctx)
            }
            _ => Err(AdvancementError::InputMismatch { expected: "item grant" }),
        }
    }

    /// Template keys to grant at `level`.
    fn selection(
        &self,
        level: u32,
        input: Option<&AdvancementInput>,
    ) -> Result<BTreeSet<String>, AdvancementError> {
        let keys: BTreeSet<String> = self
            .configuration
            .items
            .iter()
            .map(|t| t.grant_key().to_string())
            .collect();
        if self.is_automatic(None, level) {
            return Ok(keys);
        }

        let selected = match input {
            Some(AdvancementInput::ItemGrant(choice)) => &choice.selected,
            Some(_) => return Err(AdvancementError::InputMismatch { expected: "item grant" }),
            None => return Err(AdvancementError::MissingInput),
        };
        if let Some(unknown) = selected.iter().find(|key| !keys.contains(*key)) {
            return Err(AdvancementError::invalid_choice(format!(
                "{} is not offered by this grant",
                unknown
            )));
        }
        if let Some(count) = self.configuration.choose {
            let picked = selected.len() as u32;
            let allowed = if self.configuration.optional {
                picked <= count
            } else {
                picked == count
            };
            if !allowed {
                return Err(AdvancementError::invalid_choice(format!(
                    "choose {} item(s), {} selected",
                    count, picked
                )));
            }
        }
        Ok(selected.clone())
    }
}
