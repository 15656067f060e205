//! Character document store port.

use async_trait::async_trait;
use heroes_domain::{Character, CharacterId, CharacterPatch, Item, ItemId};

use super::RepoError;

/// Options passed with every write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// The write is the commit of an advancement workflow, so stores and
    /// listeners must not start another one in response.
    pub is_advancement: bool,
}

impl UpdateOptions {
    pub fn advancement() -> Self {
        Self {
            is_advancement: true,
        }
    }
}

/// The narrow slice of the document store the advancement engine needs.
///
/// Items are child documents of a character and are written through the
/// `*_items` calls; `update` only touches top-level fields.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CharacterStore: Send + Sync {
    async fn get(&self, id: CharacterId) -> Result<Option<Character>, RepoError>;

    async fn update(
        &self,
        id: CharacterId,
        patch: CharacterPatch,
        options: UpdateOptions,
    ) -> Result<(), RepoError>;

    /// Create embedded items, returning their ids in input order.
    async fn create_items(
        &self,
        id: CharacterId,
        items: Vec<Item>,
        options: UpdateOptions,
    ) -> Result<Vec<ItemId>, RepoError>;

    async fn update_items(
        &self,
        id: CharacterId,
        items: Vec<Item>,
        options: UpdateOptions,
    ) -> Result<(), RepoError>;

    async fn delete_items(
        &self,
        id: CharacterId,
        ids: Vec<ItemId>,
        options: UpdateOptions,
    ) -> Result<(), RepoError>;
}
