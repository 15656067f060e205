//! In-memory character store.
//!
//! Backs the binary and the workflow tests. Every write applies to the
//! stored copy immediately; there is no transaction log.

use std::collections::HashMap;

use async_trait::async_trait;
use heroes_domain::{Character, CharacterId, CharacterPatch, Item, ItemId};
use tokio::sync::RwLock;

use super::ports::{CharacterStore, RepoError, UpdateOptions};

/// A thread-safe store of whole character documents.
#[derive(Default)]
pub struct InMemoryCharacterStore {
    characters: RwLock<HashMap<CharacterId, Character>>,
}

impl InMemoryCharacterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a character.
    pub async fn insert(&self, character: Character) {
        self.characters
            .write()
            .await
            .insert(character.id, character);
    }

    pub async fn len(&self) -> usize {
        self.characters.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.characters.read().await.is_empty()
    }

    async fn with_character<T>(
        &self,
        id: CharacterId,
        f: impl FnOnce(&mut Character) -> Result<T, RepoError>,
    ) -> Result<T, RepoError> {
        let mut guard = self.characters.write().await;
        let character = guard
            .get_mut(&id)
            .ok_or_else(|| RepoError::not_found("Character", id.to_string()))?;
        f(character)
    }
}

#[async_trait]
impl CharacterStore for InMemoryCharacterStore {
    async fn get(&self, id: CharacterId) -> Result<Option<Character>, RepoError> {
        Ok(self.characters.read().await.get(&id).cloned())
    }

    async fn update(
        &self,
        id: CharacterId,
        patch: CharacterPatch,
        options: UpdateOptions,
    ) -> Result<(), RepoError> {
        tracing::debug!(character_id = %id, is_advancement = options.is_advancement, "Updating character");
        self.with_character(id, |character| {
            patch.apply_to(character);
            Ok(())
        })
        .await
    }

    async fn create_items(
        &self,
        id: CharacterId,
        items: Vec<Item>,
        options: UpdateOptions,
    ) -> Result<Vec<ItemId>, RepoError> {
        tracing::debug!(character_id = %id, count = items.len(), is_advancement = options.is_advancement, "Creating items");
        self.with_character(id, |character| {
            if let Some(duplicate) = items.iter().find(|item| character.item(item.id).is_some()) {
                return Err(RepoError::constraint(format!(
                    "item {} already exists",
                    duplicate.id
                )));
            }
            let ids = items.iter().map(|item| item.id).collect();
            character.items.extend(items);
            Ok(ids)
        })
        .await
    }

    async fn update_items(
        &self,
        id: CharacterId,
        items: Vec<Item>,
        options: UpdateOptions,
    ) -> Result<(), RepoError> {
        tracing::debug!(character_id = %id, count = items.len(), is_advancement = options.is_advancement, "Updating items");
        self.with_character(id, |character| {
            for item in items {
                let existing = character
                    .item_mut(item.id)
                    .ok_or_else(|| RepoError::not_found("Item", item.id.to_string()))?;
                *existing = item;
            }
            Ok(())
        })
        .await
    }

    async fn delete_items(
        &self,
        id: CharacterId,
        ids: Vec<ItemId>,
        options: UpdateOptions,
    ) -> Result<(), RepoError> {
        tracing::debug!(character_id = %id, count = ids.len(), is_advancement = options.is_advancement, "Deleting items");
        self.with_character(id, |character| {
            character.items.retain(|item| !ids.contains(&item.id));
            Ok(())
        })
        .await
    }
}
