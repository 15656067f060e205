//! Port traits for infrastructure boundaries.

mod error;
mod store;

pub use error::RepoError;
pub use store::{CharacterStore, UpdateOptions};

#[cfg(test)]
pub use store::MockCharacterStore;
