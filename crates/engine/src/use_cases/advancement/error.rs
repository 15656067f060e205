use heroes_domain::{CharacterId, DomainError};

use crate::infrastructure::ports::RepoError;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The workflow was cancelled; expected control flow, not a failure.
    #[error("Advancement workflow was cancelled")]
    Cancelled,
    #[error("An advancement workflow is already running for character {0}")]
    AlreadyInProgress(CharacterId),
    #[error("Invalid workflow state: {0}")]
    InvalidState(String),
    /// Step construction or bookkeeping bug.
    #[error("Advancement workflow invariant violated: {0}")]
    Invariant(String),
    #[error("Advancement workflow was vetoed by a hook")]
    Vetoed,
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl WorkflowError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }
}
