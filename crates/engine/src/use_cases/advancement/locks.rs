//! One workflow per character at a time.

use std::sync::Arc;

use dashmap::DashSet;
use heroes_domain::CharacterId;

use super::WorkflowError;

/// Registry of characters with a running workflow.
#[derive(Debug, Clone, Default)]
pub struct WorkflowLocks {
    active: Arc<DashSet<CharacterId>>,
}

impl WorkflowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a character, refusing if another workflow holds it.
    pub fn acquire(&self, character_id: CharacterId) -> Result<WorkflowLease, WorkflowError> {
        if self.active.insert(character_id) {
            Ok(WorkflowLease {
                character_id,
                active: Arc::clone(&self.active),
            })
        } else {
            Err(WorkflowError::AlreadyInProgress(character_id))
        }
    }

    pub fn is_locked(&self, character_id: CharacterId) -> bool {
        self.active.contains(&character_id)
    }
}

/// Held by a running workflow; releases the character when dropped.
#[derive(Debug)]
pub struct WorkflowLease {
    character_id: CharacterId,
    active: Arc<DashSet<CharacterId>>,
}

impl Drop for WorkflowLease {
    fn drop(&mut self) {
        self.active.remove(&self.character_id);
    }
}
