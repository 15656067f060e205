//! Step list construction, one factory per trigger.
//!
//! Factories never fail for "nothing to do": an unknown item or an item
//! without advancement history yields a manager with no steps, and callers
//! check [`AdvancementManager::is_empty`] before running anything.

use std::collections::HashMap;

use heroes_domain::{AdvancementDefinition, AdvancementId, Character, Item, ItemId, SystemConfig};

use super::manager::{AdvancementManager, ManagerContext};
use super::step::{AdvancementRef, AdvancementStep};
use super::WorkflowError;

impl AdvancementManager {
    /// Apply every advancement on a newly added item, for each level from 1
    /// up to the character's level. Values the item carries from another
    /// character are dropped first.
    pub fn for_new_item(actor: Character, mut item: Item, context: ManagerContext) -> Self {
        item.clear_advancement_values();
        let mut manager = Self::new(actor, context);
        let level = manager.clone_character().level;

        let mut steps = Vec::new();
        for current in 1..=level {
            push_forward_steps(&mut steps, &item, current);
        }
        if steps.is_empty() {
            return manager;
        }

        manager.clone_mut().items.push(item);
        manager.steps = steps;
        manager
    }

    /// Reverse every applied advancement on an item, highest level first,
    /// then delete the item.
    pub fn for_deleted_item(actor: Character, item_id: ItemId, context: ManagerContext) -> Self {
        let mut manager = Self::new(actor, context);
        let Some(item) = manager.clone_character().item(item_id) else {
            return manager;
        };

        let definitions: Vec<&AdvancementDefinition> = item.advancement.iter().collect();
        let mut steps = reverse_applied(item_id, &definitions, 1, u32::MAX, &mut HashMap::new());
        if steps.is_empty() {
            return manager;
        }

        steps.push(AdvancementStep::delete_item(item_id));
        manager.steps = steps;
        manager
    }

    /// Reverse one advancement at every applied level, then remove it from
    /// its item.
    pub fn for_deleted_advancement(
        actor: Character,
        item_id: ItemId,
        advancement_id: AdvancementId,
        context: ManagerContext,
    ) -> Self {
        let mut manager = Self::new(actor, context);
        let Some(definition) = manager
            .clone_character()
            .item(item_id)
            .and_then(|item| item.advancement(advancement_id))
        else {
            return manager;
        };

        let mut steps = reverse_applied(item_id, &[definition], 1, u32::MAX, &mut HashMap::new());
        if steps.is_empty() {
            return manager;
        }

        steps.push(AdvancementStep::delete_advancement(item_id, advancement_id));
        manager.steps = steps;
        manager
    }

    /// Author new advancements onto an item the character already has.
    ///
    /// Every advancement on the item is reversed from the character's level
    /// down to the lowest level of the new ones; the new definitions are
    /// spliced in and the range is rebuilt. Rebuilt steps matching a reversed
    /// advancement id and level restore the old outcome; the rest are fresh
    /// forward steps. When the new advancements only start above the
    /// character's level there are no steps and the item is updated directly.
    pub fn for_new_advancement(
        actor: Character,
        item_id: ItemId,
        advancements: Vec<AdvancementDefinition>,
        context: ManagerContext,
    ) -> Result<Self, WorkflowError> {
        for definition in &advancements {
            definition.validate()?;
        }

        let mut manager = Self::new(actor, context);
        let level = manager.clone_character().level;
        let Some(min_level) = advancements.iter().filter_map(|d| d.min_level()).min() else {
            return Ok(manager);
        };
        let Some(item) = manager.clone_character().item(item_id) else {
            return Ok(manager);
        };
        if min_level > level {
            return Ok(manager);
        }

        let mut reversed = HashMap::new();
        let definitions: Vec<&AdvancementDefinition> = item.advancement.iter().collect();
        let mut steps = reverse_applied(item_id, &definitions, min_level, level, &mut reversed);

        let item = manager
            .clone_mut()
            .item_mut(item_id)
            .ok_or_else(|| WorkflowError::invariant(format!("item {item_id} vanished")))?;
        for definition in advancements {
            item.add_advancement(definition)?;
        }

        let item = manager
            .clone_character()
            .item(item_id)
            .ok_or_else(|| WorkflowError::invariant(format!("item {item_id} vanished")))?;
        for current in min_level..=level {
            for definition in item.advancement_collection().by_level(current) {
                let target = AdvancementRef {
                    item_id,
                    advancement_id: definition.id,
                    level: current,
                };
                let step = match reversed.get(&(definition.id, current)) {
                    Some(&index) => AdvancementStep::restore(target, index),
                    None => AdvancementStep::forward(target, definition.is_automatic(current)),
                };
                steps.push(step);
            }
        }

        manager.steps = steps;
        Ok(manager)
    }

    /// Re-open the choices one advancement made at one level.
    ///
    /// The item's advancements are reversed from the character's level down
    /// to `level`; the target is offered again with its old choice
    /// pre-filled and everything else is restored unchanged.
    pub fn for_modified_choices(
        actor: Character,
        item_id: ItemId,
        advancement_id: AdvancementId,
        level: u32,
        context: ManagerContext,
    ) -> Self {
        let mut manager = Self::new(actor, context);
        let current_level = manager.clone_character().level;
        let Some(item) = manager.clone_character().item(item_id) else {
            return manager;
        };
        let applied = item
            .advancement(advancement_id)
            .is_some_and(|definition| definition.is_applied(level));
        if !applied || level > current_level {
            return manager;
        }

        let mut reversed = HashMap::new();
        let definitions: Vec<&AdvancementDefinition> = item.advancement.iter().collect();
        let mut steps = reverse_applied(item_id, &definitions, level, current_level, &mut reversed);

        for current in level..=current_level {
            for definition in item.advancement_collection().by_level(current) {
                let Some(&index) = reversed.get(&(definition.id, current)) else {
                    continue;
                };
                let target = AdvancementRef {
                    item_id,
                    advancement_id: definition.id,
                    level: current,
                };
                let step = if definition.id == advancement_id && current == level {
                    AdvancementStep::forward(target, false).with_retained_from(index)
                } else {
                    AdvancementStep::restore(target, index)
                };
                steps.push(step);
            }
        }

        manager.steps = steps;
        manager
    }

    /// Raise or lower the character level by `delta`, clamped to the
    /// configured range.
    ///
    /// Going up, each level gets a level marker followed by the concept
    /// items' advancements (in configured order) and then every other item's
    /// in item order. Going down mirrors that exactly.
    pub fn for_level_change(actor: Character, delta: i32, context: ManagerContext) -> Self {
        let mut manager = Self::new(actor, context);
        let current = manager.clone_character().level;
        let max_level = manager.context.config.max_level;
        let target = (i64::from(current) + i64::from(delta)).clamp(0, i64::from(max_level)) as u32;

        let items = ordered_items(manager.clone_character(), &manager.context.config);
        let mut steps = Vec::new();
        if target > current {
            for level in current + 1..=target {
                steps.push(AdvancementStep::level(1));
                for item in &items {
                    push_forward_steps(&mut steps, item, level);
                }
            }
        } else {
            for level in (target + 1..=current).rev() {
                for item in items.iter().rev() {
                    for definition in item.advancement_collection().by_level(level).into_iter().rev() {
                        if definition.is_applied(level) {
                            steps.push(AdvancementStep::reverse(AdvancementRef {
                                item_id: item.id,
                                advancement_id: definition.id,
                                level,
                            }));
                        }
                    }
                }
                steps.push(AdvancementStep::level(-1));
            }
        }

        manager.steps = steps;
        manager
    }
}

fn push_forward_steps(steps: &mut Vec<AdvancementStep>, item: &Item, level: u32) {
    for definition in item.advancement_collection().by_level(level) {
        let target = AdvancementRef {
            item_id: item.id,
            advancement_id: definition.id,
            level,
        };
        steps.push(AdvancementStep::forward(target, definition.is_automatic(level)));
    }
}

/// Reverse steps for every applied level in `from..=to`, highest level first
/// and in reverse collection order within a level. Each step's index is
/// recorded in `reversed` by advancement id and level.
fn reverse_applied(
    item_id: ItemId,
    definitions: &[&AdvancementDefinition],
    from: u32,
    to: u32,
    reversed: &mut HashMap<(AdvancementId, u32), usize>,
) -> Vec<AdvancementStep> {
    let mut levels: Vec<u32> = definitions
        .iter()
        .flat_map(|definition| definition.applied_levels())
        .filter(|level| (from..=to).contains(level))
        .collect();
    levels.sort_unstable();
    levels.dedup();

    let mut steps = Vec::new();
    for &level in levels.iter().rev() {
        for definition in definitions.iter().rev() {
            if !definition.is_applied(level) {
                continue;
            }
            reversed.insert((definition.id, level), steps.len());
            steps.push(AdvancementStep::reverse(AdvancementRef {
                item_id,
                advancement_id: definition.id,
                level,
            }));
        }
    }
    steps
}

/// Concept items in configured order, then everything else in item order.
fn ordered_items(character: &Character, config: &SystemConfig) -> Vec<Item> {
    let mut items = character.items.clone();
    items.sort_by_key(|item| config.concept_rank(item.kind).unwrap_or(usize::MAX));
    items
}
