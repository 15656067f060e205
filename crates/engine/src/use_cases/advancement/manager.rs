//! The advancement workflow state machine.
//!
//! A manager owns the original character, a scratch copy every step mutates,
//! and an ordered step list built by one of the factories in
//! [`factories`](super::factories). Nothing reaches the store until
//! [`AdvancementManager::complete`] commits the diff between the two.

use std::sync::Arc;

use heroes_domain::{
    derive_character, AdvancementContext, AdvancementDefinition, AdvancementError,
    AdvancementInput, Character, DerivedCharacter, RetainedData, SystemConfig,
};

use crate::infrastructure::ports::{CharacterStore, UpdateOptions};

use super::locks::{WorkflowLease, WorkflowLocks};
use super::ports::{AdvancementHooks, FlowRequest, NoopHooks};
use super::step::{AdvancementRef, AdvancementStep, StepKind, StepTarget, StepUndo};
use super::{CommitSummary, PendingCommit, WorkflowError};

/// Shared, read-only collaborators every manager is built with.
#[derive(Clone)]
pub struct ManagerContext {
    pub config: Arc<SystemConfig>,
    pub hooks: Arc<dyn AdvancementHooks>,
    pub locks: WorkflowLocks,
}

impl ManagerContext {
    pub fn new(config: Arc<SystemConfig>) -> Self {
        Self {
            config,
            hooks: Arc::new(NoopHooks),
            locks: WorkflowLocks::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn AdvancementHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_locks(mut self, locks: WorkflowLocks) -> Self {
        self.locks = locks;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    /// Built but not started.
    Idle,
    Running,
    /// Suspended on a non-automatic step.
    AwaitingInput,
    /// Every step ran; waiting for `complete`.
    Complete,
    Committed,
    Cancelled,
}

/// Where the workflow stopped after a call.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    AwaitingInput(FlowRequest),
    ReadyToCommit,
    /// Stepped back past the first step; the workflow is cancelled.
    Closed,
}

/// How a single step failed.
enum StepFailure {
    /// Recoverable; the step is re-offered to the user.
    Advancement(AdvancementError),
    Fatal(WorkflowError),
}

impl From<WorkflowError> for StepFailure {
    fn from(err: WorkflowError) -> Self {
        Self::Fatal(err)
    }
}

pub struct AdvancementManager {
    actor: Character,
    clone: Character,
    derived: DerivedCharacter,
    pub(super) steps: Vec<AdvancementStep>,
    step_index: usize,
    state: WorkflowState,
    error: Option<AdvancementError>,
    pub(super) context: ManagerContext,
    lease: Option<WorkflowLease>,
}

impl AdvancementManager {
    pub(super) fn new(actor: Character, context: ManagerContext) -> Self {
        let clone = actor.clone();
        let derived = derive_character(&clone, &context.config);
        Self {
            actor,
            clone,
            derived,
            steps: Vec::new(),
            step_index: 0,
            state: WorkflowState::Idle,
            error: None,
            context,
            lease: None,
        }
    }

    /// The character as loaded, untouched until commit.
    pub fn actor(&self) -> &Character {
        &self.actor
    }

    /// The scratch copy the steps mutate.
    pub fn clone_character(&self) -> &Character {
        &self.clone
    }

    pub(super) fn clone_mut(&mut self) -> &mut Character {
        &mut self.clone
    }

    pub fn derived(&self) -> &DerivedCharacter {
        &self.derived
    }

    pub fn steps(&self) -> &[AdvancementStep] {
        &self.steps
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn current_step(&self) -> Option<&AdvancementStep> {
        self.steps.get(self.step_index)
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Error from the last failed attempt at the current step.
    pub fn error(&self) -> Option<&AdvancementError> {
        self.error.as_ref()
    }

    /// Nothing to do; callers write directly instead of opening a workflow.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Claim the character and run until input is needed or every step ran.
    pub fn begin(&mut self) -> Result<Progress, WorkflowError> {
        if self.state != WorkflowState::Idle {
            return Err(WorkflowError::invalid_state(format!(
                "cannot begin a workflow that is {:?}",
                self.state
            )));
        }
        if self.steps.is_empty() {
            return Err(WorkflowError::invariant(
                "cannot begin a workflow with no steps",
            ));
        }

        self.lease = Some(self.context.locks.acquire(self.actor.id)?);
        if !self.context.hooks.before_render(&self.clone, &self.steps) {
            tracing::info!(character_id = %self.actor.id, "Advancement workflow vetoed before render");
            self.cancel();
            return Err(WorkflowError::Vetoed);
        }

        tracing::info!(
            character_id = %self.actor.id,
            steps = self.steps.len(),
            "Starting advancement workflow"
        );
        self.advance(None)
    }

    /// Resolve the current step with user input and continue.
    pub fn submit(&mut self, input: AdvancementInput) -> Result<Progress, WorkflowError> {
        match self.state {
            WorkflowState::AwaitingInput => self.advance(Some(input)),
            WorkflowState::Cancelled => Err(WorkflowError::Cancelled),
            other => Err(WorkflowError::invalid_state(format!(
                "cannot submit input while {other:?}"
            ))),
        }
    }

    /// Undo steps until the previous interactive one, or close the workflow
    /// when stepping back past the first step.
    pub fn back(&mut self) -> Result<Progress, WorkflowError> {
        self.ensure_open()?;
        self.error = None;
        loop {
            if self.step_index == 0 {
                self.cancel();
                return Ok(Progress::Closed);
            }
            self.step_index -= 1;

            match self.undo_step(self.step_index) {
                Ok(()) => {}
                Err(StepFailure::Advancement(error)) => return self.downgrade(error),
                Err(StepFailure::Fatal(err)) => return Err(err),
            }
            self.refresh();

            if !self.steps[self.step_index].automatic {
                return self.await_input();
            }
        }
    }

    /// Step back to the first interactive step, discarding every choice made
    /// since, and render it again.
    pub fn restart(&mut self) -> Result<Progress, WorkflowError> {
        self.ensure_open()?;
        let first = self
            .steps
            .iter()
            .position(|step| !step.automatic)
            .ok_or_else(|| WorkflowError::invalid_state("workflow has no interactive step"))?;

        while self.step_index > first {
            match self.back()? {
                Progress::Closed => return Ok(Progress::Closed),
                // An undo failed; stay on that step.
                progress if self.error.is_some() => return Ok(progress),
                _ => {}
            }
        }
        for step in &mut self.steps[first..] {
            if step.kind == StepKind::Forward {
                step.retained = None;
            }
        }
        self.error = None;
        self.await_input()
    }

    /// Discard the scratch copy. Safe at any step; a committed or already
    /// cancelled workflow is left alone.
    pub fn cancel(&mut self) {
        if matches!(
            self.state,
            WorkflowState::Committed | WorkflowState::Cancelled
        ) {
            return;
        }
        self.clone = self.actor.clone();
        self.refresh();
        self.lease = None;
        self.state = WorkflowState::Cancelled;
        tracing::debug!(
            character_id = %self.actor.id,
            step = self.step_index,
            "Advancement workflow cancelled"
        );
    }

    /// Write the difference between the scratch copy and the original.
    ///
    /// Returns `None` when a hook vetoes the commit, in which case nothing
    /// is written and the workflow is cancelled.
    pub async fn complete(
        &mut self,
        store: &dyn CharacterStore,
    ) -> Result<Option<CommitSummary>, WorkflowError> {
        if self.state != WorkflowState::Complete {
            return Err(WorkflowError::invalid_state(format!(
                "cannot commit a workflow that is {:?}",
                self.state
            )));
        }

        let mut pending = PendingCommit::diff(&self.actor, &self.clone);
        if !self.context.hooks.before_commit(&self.clone, &mut pending) {
            tracing::info!(character_id = %self.actor.id, "Advancement commit vetoed");
            self.cancel();
            return Ok(None);
        }

        let character_id = self.actor.id;
        let options = UpdateOptions::advancement();
        let updated = pending.to_update.iter().map(|item| item.id).collect();
        store.update(character_id, pending.patch, options).await?;
        let created = store
            .create_items(character_id, pending.to_create, options)
            .await?;
        store
            .update_items(character_id, pending.to_update, options)
            .await?;
        store
            .delete_items(character_id, pending.to_delete.clone(), options)
            .await?;

        let summary = CommitSummary {
            character_id,
            level: self.clone.level,
            created,
            updated,
            deleted: pending.to_delete,
        };
        self.actor = self.clone.clone();
        self.context.hooks.after_commit(&self.actor, &summary);
        self.state = WorkflowState::Committed;
        self.lease = None;

        tracing::info!(
            character_id = %character_id,
            level = summary.level,
            created = summary.created.len(),
            updated = summary.updated.len(),
            deleted = summary.deleted.len(),
            "Advancement workflow committed"
        );
        Ok(Some(summary))
    }

    fn ensure_open(&self) -> Result<(), WorkflowError> {
        match self.state {
            WorkflowState::Running | WorkflowState::AwaitingInput | WorkflowState::Complete => {
                Ok(())
            }
            WorkflowState::Cancelled => Err(WorkflowError::Cancelled),
            other => Err(WorkflowError::invalid_state(format!(
                "workflow is {other:?}"
            ))),
        }
    }

    fn refresh(&mut self) {
        self.derived = derive_character(&self.clone, &self.context.config);
    }

    /// Run steps from the current index while they can run unattended.
    fn advance(&mut self, mut input: Option<AdvancementInput>) -> Result<Progress, WorkflowError> {
        self.state = WorkflowState::Running;
        while self.step_index < self.steps.len() {
            if !self.steps[self.step_index].automatic && input.is_none() {
                return self.await_input();
            }

            match self.execute_step(self.step_index, input.take()) {
                Ok(()) => {}
                Err(StepFailure::Advancement(error)) => return self.downgrade(error),
                Err(StepFailure::Fatal(err)) => return Err(err),
            }

            self.step_index += 1;
            self.refresh();
            self.error = None;
        }

        self.state = WorkflowState::Complete;
        Ok(Progress::ReadyToCommit)
    }

    /// Hold on a failed step and hand it to the user instead of retrying it.
    fn downgrade(&mut self, error: AdvancementError) -> Result<Progress, WorkflowError> {
        let step = &mut self.steps[self.step_index];
        tracing::warn!(
            character_id = %self.actor.id,
            step = self.step_index,
            kind = ?step.kind,
            error = %error,
            "Advancement step failed, awaiting user input"
        );
        step.automatic = false;
        if step.kind == StepKind::Restore {
            step.kind = StepKind::Forward;
        }
        self.error = Some(error);
        self.await_input()
    }

    fn await_input(&mut self) -> Result<Progress, WorkflowError> {
        self.state = WorkflowState::AwaitingInput;
        let request = self.flow_request()?;
        Ok(Progress::AwaitingInput(request))
    }

    fn flow_request(&self) -> Result<FlowRequest, WorkflowError> {
        let target = self
            .current_step()
            .and_then(AdvancementStep::advancement)
            .ok_or_else(|| {
                WorkflowError::invariant(format!(
                    "step {} cannot take user input",
                    self.step_index
                ))
            })?;
        let item = self.clone.item(target.item_id).ok_or_else(|| {
            WorkflowError::invariant(format!("item {} is not on the character", target.item_id))
        })?;
        let advancement = item.advancement(target.advancement_id).ok_or_else(|| {
            WorkflowError::invariant(format!(
                "advancement {} is not on item {}",
                target.advancement_id, target.item_id
            ))
        })?;

        Ok(FlowRequest {
            character_id: self.actor.id,
            item_id: item.id,
            item_name: item.name.clone(),
            advancement: advancement.clone(),
            level: target.level,
            retained: self.retained_for(self.step_index).cloned(),
            derived: self.derived.clone(),
            error: self.error.as_ref().map(ToString::to_string),
        })
    }

    /// Retained data a step should reuse: its own from an earlier reversal,
    /// otherwise that of the reverse step it is linked to.
    fn retained_for(&self, index: usize) -> Option<&RetainedData> {
        let step = self.steps.get(index)?;
        step.retained.as_ref().or_else(|| {
            step.retained_from
                .and_then(|from| self.steps.get(from))
                .and_then(|linked| linked.retained.as_ref())
        })
    }

    fn execute_step(
        &mut self,
        index: usize,
        input: Option<AdvancementInput>,
    ) -> Result<(), StepFailure> {
        let step = self.steps[index].clone();
        tracing::debug!(
            character_id = %self.actor.id,
            step = index,
            kind = ?step.kind,
            "Executing advancement step"
        );

        match (step.kind, step.target) {
            (StepKind::Level, StepTarget::Level { delta }) => {
                self.clone.level = self.clone.level.saturating_add_signed(delta);
            }
            (StepKind::Delete, StepTarget::Item(item_id)) => {
                let (position, item) = self.clone.remove_item(item_id).ok_or_else(|| {
                    WorkflowError::invariant(format!("item {item_id} is not on the character"))
                })?;
                self.steps[index].undo = Some(StepUndo::Item {
                    index: position,
                    item,
                });
            }
            (
                StepKind::Delete,
                StepTarget::ItemAdvancement {
                    item_id,
                    advancement_id,
                },
            ) => {
                let (position, definition) = self
                    .clone
                    .item_mut(item_id)
                    .and_then(|item| item.remove_advancement(advancement_id))
                    .ok_or_else(|| {
                        WorkflowError::invariant(format!(
                            "advancement {advancement_id} is not on item {item_id}"
                        ))
                    })?;
                self.steps[index].undo = Some(StepUndo::Advancement {
                    item_id,
                    index: position,
                    definition,
                });
            }
            (StepKind::Forward, StepTarget::Advancement(target)) => {
                self.run_advancement(target, |definition, ctx| {
                    definition.apply(target.level, input.as_ref(), ctx)
                })?;
            }
            (StepKind::Restore, StepTarget::Advancement(target)) => {
                let retained = self.retained_for(index).cloned().ok_or_else(|| {
                    WorkflowError::invariant(format!("restore step {index} has no retained data"))
                })?;
                self.run_advancement(target, |definition, ctx| {
                    definition.restore(target.level, &retained, ctx)
                })?;
            }
            (StepKind::Reverse, StepTarget::Advancement(target)) => {
                let retained = self.run_advancement(target, |definition, ctx| {
                    definition.reverse(target.level, ctx)
                })?;
                self.steps[index].retained = Some(retained);
            }
            (kind, target) => {
                return Err(WorkflowError::invariant(format!(
                    "{kind:?} step cannot target {target:?}"
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Take back the effects of an executed step.
    fn undo_step(&mut self, index: usize) -> Result<(), StepFailure> {
        let step = self.steps[index].clone();
        tracing::debug!(
            character_id = %self.actor.id,
            step = index,
            kind = ?step.kind,
            "Undoing advancement step"
        );

        match (step.kind, step.target) {
            (StepKind::Level, StepTarget::Level { delta }) => {
                self.clone.level = self.clone.level.saturating_add_signed(-delta);
            }
            (StepKind::Delete, _) => match self.steps[index].undo.take() {
                Some(StepUndo::Item { index, item }) => self.clone.insert_item(index, item),
                Some(StepUndo::Advancement {
                    item_id,
                    index,
                    definition,
                }) => {
                    let item = self.clone.item_mut(item_id).ok_or_else(|| {
                        WorkflowError::invariant(format!("item {item_id} is not on the character"))
                    })?;
                    let index = index.min(item.advancement.len());
                    item.advancement.insert(index, definition);
                }
                None => {
                    return Err(WorkflowError::invariant(format!(
                        "delete step {index} has nothing to undo"
                    ))
                    .into());
                }
            },
            (StepKind::Forward | StepKind::Restore, StepTarget::Advancement(target)) => {
                let retained = self.run_advancement(target, |definition, ctx| {
                    definition.reverse(target.level, ctx)
                })?;
                self.steps[index].retained = Some(retained);
            }
            (StepKind::Reverse, StepTarget::Advancement(target)) => {
                let retained = step.retained.ok_or_else(|| {
                    WorkflowError::invariant(format!("reverse step {index} has no retained data"))
                })?;
                self.run_advancement(target, |definition, ctx| {
                    definition.restore(target.level, &retained, ctx)
                })?;
            }
            (kind, target) => {
                return Err(WorkflowError::invariant(format!(
                    "{kind:?} step cannot target {target:?}"
                ))
                .into());
            }
        }
        Ok(())
    }

    fn run_advancement<T>(
        &mut self,
        target: AdvancementRef,
        f: impl FnOnce(
            &mut AdvancementDefinition,
            &mut AdvancementContext<'_>,
        ) -> Result<T, AdvancementError>,
    ) -> Result<T, StepFailure> {
        let derived = &self.derived;
        let config = &*self.context.config;
        let result = self
            .clone
            .with_advancement(target.item_id, target.advancement_id, |definition, actor| {
                let mut ctx = AdvancementContext {
                    actor,
                    derived,
                    config,
                    item_id: target.item_id,
                    advancement_id: target.advancement_id,
                };
                f(definition, &mut ctx)
            })
            .map_err(|err| StepFailure::Fatal(err.into()))?;
        result.map_err(StepFailure::Advancement)
    }
}
