//! Net result of a workflow, written to the store in one go.

use std::collections::HashSet;

use heroes_domain::{Character, CharacterId, CharacterPatch, Item, ItemId};

/// Everything `complete` is about to write. Hooks may rewrite it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingCommit {
    pub patch: CharacterPatch,
    /// Items in the scratch copy but not the original.
    pub to_create: Vec<Item>,
    /// Items in both.
    pub to_update: Vec<Item>,
    /// Original items missing from the scratch copy.
    pub to_delete: Vec<ItemId>,
}

impl PendingCommit {
    pub fn diff(original: &Character, updated: &Character) -> Self {
        let original_ids: HashSet<ItemId> = original.items.iter().map(|i| i.id).collect();
        let updated_ids: HashSet<ItemId> = updated.items.iter().map(|i| i.id).collect();

        let (to_update, to_create): (Vec<Item>, Vec<Item>) = updated
            .items
            .iter()
            .cloned()
            .partition(|item| original_ids.contains(&item.id));
        let to_delete = original
            .items
            .iter()
            .filter(|item| !updated_ids.contains(&item.id))
            .map(|item| item.id)
            .collect();

        Self {
            patch: CharacterPatch::diff(original, updated),
            to_create,
            to_update,
            to_delete,
        }
    }
}

/// What a committed workflow wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub character_id: CharacterId,
    pub level: u32,
    pub created: Vec<ItemId>,
    pub updated: Vec<ItemId>,
    pub deleted: Vec<ItemId>,
}
