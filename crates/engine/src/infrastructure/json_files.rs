//! JSON file helpers for the engine binary.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ports::RepoError;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, RepoError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| RepoError::storage("read_json", e))?;
    Ok(serde_json::from_str(&contents)?)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), RepoError> {
    let contents = serde_json::to_string_pretty(value)?;
    std::fs::write(path, contents).map_err(|e| RepoError::storage("write_json", e))
}
