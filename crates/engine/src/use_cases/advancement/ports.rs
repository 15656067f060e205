//! Collaborators the workflow calls out to: the flow adapter that collects
//! user input, and the lifecycle hooks.

use async_trait::async_trait;
use heroes_domain::{
    AdvancementDefinition, AdvancementInput, Character, CharacterId, DerivedCharacter, ItemId,
    RetainedData,
};

use super::{AdvancementStep, CommitSummary, PendingCommit};

/// Everything a flow needs to render one non-automatic step.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRequest {
    pub character_id: CharacterId,
    pub item_id: ItemId,
    pub item_name: String,
    /// Snapshot of the advancement as it stands on the scratch copy.
    pub advancement: AdvancementDefinition,
    pub level: u32,
    /// Data from an earlier reversal, to pre-populate previous choices.
    pub retained: Option<RetainedData>,
    pub derived: DerivedCharacter,
    /// Message from the last failed attempt at this step.
    pub error: Option<String>,
}

impl FlowRequest {
    /// The input previously chosen for this step, if any.
    pub fn previous_choice(&self) -> Option<&AdvancementInput> {
        self.retained.as_ref().and_then(RetainedData::choice)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowResponse {
    Submit(AdvancementInput),
    Back,
    Restart,
    /// The user closed the flow; the whole workflow is cancelled.
    Cancel,
}

/// UI-facing adapter that turns a pending step into user input.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FlowPort: Send + Sync {
    async fn request(&self, request: FlowRequest) -> FlowResponse;
}

/// Extension points around a workflow.
#[cfg_attr(test, mockall::automock)]
pub trait AdvancementHooks: Send + Sync {
    /// Called once before the first step renders. Returning `false` vetoes
    /// the workflow.
    fn before_render(&self, character: &Character, steps: &[AdvancementStep]) -> bool;

    /// May inspect or rewrite the pending writes. Returning `false` aborts
    /// the commit without writing anything.
    fn before_commit(&self, character: &Character, pending: &mut PendingCommit) -> bool;

    fn after_commit(&self, character: &Character, summary: &CommitSummary);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl AdvancementHooks for NoopHooks {
    fn before_render(&self, _character: &Character, _steps: &[AdvancementStep]) -> bool {
        true
    }

    fn before_commit(&self, _character: &Character, _pending: &mut PendingCommit) -> bool {
        true
    }

    fn after_commit(&self, _character: &Character, _summary: &CommitSummary) {}
}
