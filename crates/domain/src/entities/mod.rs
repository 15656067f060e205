//! Entities - the character document and the items embedded in it

mod character;
mod item;

pub use character::{Character, CharacterPatch, HitPointState, RecoveryPeriod, ResourcePool};
pub use item::{GrantOrigin, Item, ItemKind};
