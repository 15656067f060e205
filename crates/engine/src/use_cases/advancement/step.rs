//! Units of work in an advancement workflow.

use heroes_domain::{AdvancementDefinition, AdvancementId, Item, ItemId, RetainedData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Apply an advancement at a level.
    Forward,
    /// Undo an applied advancement at a level.
    Reverse,
    /// Re-apply a reversed level from retained data.
    Restore,
    /// Remove an item or an advancement from its item.
    Delete,
    /// Change the character level.
    Level,
}

/// One advancement at one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvancementRef {
    pub item_id: ItemId,
    pub advancement_id: AdvancementId,
    pub level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepTarget {
    Advancement(AdvancementRef),
    Item(ItemId),
    ItemAdvancement {
        item_id: ItemId,
        advancement_id: AdvancementId,
    },
    Level {
        delta: i32,
    },
}

/// What a delete step removed, kept so stepping back can put it back.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StepUndo {
    Item {
        index: usize,
        item: Item,
    },
    Advancement {
        item_id: ItemId,
        index: usize,
        definition: AdvancementDefinition,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvancementStep {
    pub kind: StepKind,
    pub target: StepTarget,
    /// Runs without user input.
    pub automatic: bool,
    /// Data returned by the last reversal of this step.
    pub retained: Option<RetainedData>,
    /// Index of the reverse step whose retained data this step reuses.
    pub retained_from: Option<usize>,
    pub(crate) undo: Option<StepUndo>,
}

impl AdvancementStep {
    fn new(kind: StepKind, target: StepTarget, automatic: bool) -> Self {
        Self {
            kind,
            target,
            automatic,
            retained: None,
            retained_from: None,
            undo: None,
        }
    }

    pub fn forward(target: AdvancementRef, automatic: bool) -> Self {
        Self::new(StepKind::Forward, StepTarget::Advancement(target), automatic)
    }

    pub fn reverse(target: AdvancementRef) -> Self {
        Self::new(StepKind::Reverse, StepTarget::Advancement(target), true)
    }

    /// Restore `target` from the data retained by the step at `reverse_index`.
    pub fn restore(target: AdvancementRef, reverse_index: usize) -> Self {
        Self::new(StepKind::Restore, StepTarget::Advancement(target), true)
            .with_retained_from(reverse_index)
    }

    pub fn with_retained_from(mut self, reverse_index: usize) -> Self {
        self.retained_from = Some(reverse_index);
        self
    }

    pub fn delete_item(item_id: ItemId) -> Self {
        Self::new(StepKind::Delete, StepTarget::Item(item_id), true)
    }

    pub fn delete_advancement(item_id: ItemId, advancement_id: AdvancementId) -> Self {
        Self::new(
            StepKind::Delete,
            StepTarget::ItemAdvancement {
                item_id,
                advancement_id,
            },
            true,
        )
    }

    pub fn level(delta: i32) -> Self {
        Self::new(StepKind::Level, StepTarget::Level { delta }, true)
    }

    pub fn advancement(&self) -> Option<AdvancementRef> {
        match self.target {
            StepTarget::Advancement(target) => Some(target),
            _ => None,
        }
    }
}
