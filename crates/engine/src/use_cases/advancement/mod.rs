//! Advancement use cases.
//!
//! Each trigger loads the character, builds an [`AdvancementManager`] with
//! the matching factory, drives it through the [`FlowPort`] and commits.
//! Triggers that need no workflow write straight to the store.

mod commit;
mod error;
mod factories;
mod locks;
mod manager;
mod ports;
mod step;

use std::sync::Arc;

use heroes_domain::{
    AdvancementDefinition, AdvancementId, Character, CharacterId, DomainError, Item, ItemId,
};

use crate::infrastructure::ports::{CharacterStore, UpdateOptions};

pub use commit::{CommitSummary, PendingCommit};
pub use error::WorkflowError;
pub use locks::{WorkflowLease, WorkflowLocks};
pub use manager::{AdvancementManager, ManagerContext, Progress, WorkflowState};
pub use ports::{AdvancementHooks, FlowPort, FlowRequest, FlowResponse, NoopHooks};
pub use step::{AdvancementRef, AdvancementStep, StepKind, StepTarget};

#[cfg(test)]
pub use ports::{MockAdvancementHooks, MockFlowPort};

/// How a trigger ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// Changes were written, through a workflow or directly.
    Committed(CommitSummary),
    /// The trigger had no effect.
    NothingToDo,
    /// A hook vetoed the workflow or its commit; nothing was written.
    Vetoed,
}

/// Container for advancement use cases.
pub struct AdvancementUseCases {
    store: Arc<dyn CharacterStore>,
    flow: Arc<dyn FlowPort>,
    context: ManagerContext,
}

impl AdvancementUseCases {
    pub fn new(
        store: Arc<dyn CharacterStore>,
        flow: Arc<dyn FlowPort>,
        context: ManagerContext,
    ) -> Self {
        Self {
            store,
            flow,
            context,
        }
    }

    pub async fn change_level(
        &self,
        character_id: CharacterId,
        delta: i32,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let actor = self.load(character_id).await?;
        let manager = AdvancementManager::for_level_change(actor, delta, self.context.clone());
        self.drive(manager).await
    }

    pub async fn add_item(
        &self,
        character_id: CharacterId,
        mut item: Item,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        item.clear_advancement_values();
        let actor = self.load(character_id).await?;
        let manager =
            AdvancementManager::for_new_item(actor, item.clone(), self.context.clone());
        if !manager.is_empty() {
            return self.drive(manager).await;
        }

        let created = self
            .store
            .create_items(character_id, vec![item], UpdateOptions::default())
            .await?;
        tracing::info!(character_id = %character_id, "Added item without advancement");
        Ok(WorkflowOutcome::Committed(CommitSummary {
            character_id,
            level: manager.actor().level,
            created,
            updated: Vec::new(),
            deleted: Vec::new(),
        }))
    }

    /// Remove an item, reversing its advancements first when it has any
    /// history on the character.
    pub async fn delete_item(
        &self,
        character_id: CharacterId,
        item_id: ItemId,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let actor = self.load(character_id).await?;
        let manager = AdvancementManager::for_deleted_item(actor, item_id, self.context.clone());
        if !manager.is_empty() {
            return self.drive(manager).await;
        }
        if manager.actor().item(item_id).is_none() {
            return Err(DomainError::not_found("Item", item_id.to_string()).into());
        }

        self.store
            .delete_items(character_id, vec![item_id], UpdateOptions::default())
            .await?;
        tracing::info!(character_id = %character_id, item_id = %item_id, "Deleted item without advancement history");
        Ok(WorkflowOutcome::Committed(CommitSummary {
            character_id,
            level: manager.actor().level,
            created: Vec::new(),
            updated: Vec::new(),
            deleted: vec![item_id],
        }))
    }

    pub async fn add_advancement(
        &self,
        character_id: CharacterId,
        item_id: ItemId,
        advancements: Vec<AdvancementDefinition>,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let actor = self.load(character_id).await?;
        let manager = AdvancementManager::for_new_advancement(
            actor,
            item_id,
            advancements.clone(),
            self.context.clone(),
        )?;
        if !manager.is_empty() {
            return self.drive(manager).await;
        }

        let mut item = existing_item(manager.actor(), item_id)?;
        for definition in advancements {
            item.add_advancement(definition)?;
        }
        self.update_item_directly(manager.actor(), item).await
    }

    pub async fn delete_advancement(
        &self,
        character_id: CharacterId,
        item_id: ItemId,
        advancement_id: AdvancementId,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let actor = self.load(character_id).await?;
        let manager = AdvancementManager::for_deleted_advancement(
            actor,
            item_id,
            advancement_id,
            self.context.clone(),
        );
        if !manager.is_empty() {
            return self.drive(manager).await;
        }

        let mut item = existing_item(manager.actor(), item_id)?;
        if item.remove_advancement(advancement_id).is_none() {
            return Err(DomainError::not_found("Advancement", advancement_id.to_string()).into());
        }
        self.update_item_directly(manager.actor(), item).await
    }

    /// Re-open the choices an advancement made at `level`.
    pub async fn modify_choices(
        &self,
        character_id: CharacterId,
        item_id: ItemId,
        advancement_id: AdvancementId,
        level: u32,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let actor = self.load(character_id).await?;
        let manager = AdvancementManager::for_modified_choices(
            actor,
            item_id,
            advancement_id,
            level,
            self.context.clone(),
        );
        self.drive(manager).await
    }

    async fn load(&self, character_id: CharacterId) -> Result<Character, WorkflowError> {
        self.store
            .get(character_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Character", character_id.to_string()).into())
    }

    async fn update_item_directly(
        &self,
        actor: &Character,
        item: Item,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let item_id = item.id;
        self.store
            .update_items(actor.id, vec![item], UpdateOptions::default())
            .await?;
        Ok(WorkflowOutcome::Committed(CommitSummary {
            character_id: actor.id,
            level: actor.level,
            created: Vec::new(),
            updated: vec![item_id],
            deleted: Vec::new(),
        }))
    }

    /// Run a manager to completion against the flow port.
    ///
    /// A flow cancelling, or stepping back past the first step, ends with
    /// [`WorkflowError::Cancelled`].
    async fn drive(&self, mut manager: AdvancementManager) -> Result<WorkflowOutcome, WorkflowError> {
        if manager.is_empty() {
            return Ok(WorkflowOutcome::NothingToDo);
        }

        let mut progress = match manager.begin() {
            Ok(progress) => progress,
            Err(WorkflowError::Vetoed) => return Ok(WorkflowOutcome::Vetoed),
            Err(err) => return Err(err),
        };

        loop {
            progress = match progress {
                Progress::AwaitingInput(request) => match self.flow.request(request).await {
                    FlowResponse::Submit(input) => manager.submit(input)?,
                    FlowResponse::Back => manager.back()?,
                    FlowResponse::Restart => manager.restart()?,
                    FlowResponse::Cancel => {
                        manager.cancel();
                        return Err(WorkflowError::Cancelled);
                    }
                },
                Progress::ReadyToCommit => {
                    return match manager.complete(self.store.as_ref()).await? {
                        Some(summary) => Ok(WorkflowOutcome::Committed(summary)),
                        None => Ok(WorkflowOutcome::Vetoed),
                    };
                }
                Progress::Closed => return Err(WorkflowError::Cancelled),
            };
        }
    }
}

fn existing_item(actor: &Character, item_id: ItemId) -> Result<Item, DomainError> {
    actor
        .item(item_id)
        .cloned()
        .ok_or_else(|| DomainError::not_found("Item", item_id.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use heroes_domain::advancement::ResourceAmount;
    use heroes_domain::{
        Ability, AbilityScoreAdvancement, AbilityScoreChoice, AdvancementInput, AdvancementKind,
        HitPointsAdvancement, ItemGrantAdvancement, ItemKind, RecoveryPeriod,
        ResourceAdvancement, RetainedData, SystemConfig, TraitAdvancement,
    };

    use super::*;
    use crate::infrastructure::ports::MockCharacterStore;

    fn context() -> ManagerContext {
        ManagerContext::new(Arc::new(SystemConfig::everyday_heroes()))
    }

    fn hit_points(levels: impl IntoIterator<Item = u32>) -> AdvancementDefinition {
        AdvancementDefinition::new(
            AdvancementKind::HitPoints(HitPointsAdvancement::with_denomination(8)),
            levels,
        )
    }

    fn improvement(level: u32) -> AdvancementDefinition {
        AdvancementDefinition::new(
            AdvancementKind::AbilityScoreImprovement(AbilityScoreAdvancement::improvement(2)),
            [level],
        )
    }

    fn raise(ability: Ability, by: i32) -> AdvancementInput {
        AdvancementInput::AbilityScores(AbilityScoreChoice {
            assignments: BTreeMap::from([(ability, by)]),
            ..Default::default()
        })
    }

    fn awaiting(progress: Progress) -> FlowRequest {
        match progress {
            Progress::AwaitingInput(request) => request,
            other => panic!("expected to await input, got {other:?}"),
        }
    }

    /// Level 3 hero whose class offers an ability score improvement at 4.
    fn level_three_hero() -> (Character, Item) {
        let class = Item::new("Smart Hero", ItemKind::Class)
            .with_advancement(hit_points([1, 2, 3, 4]))
            .with_advancement(improvement(4));
        let actor = Character::new("Riley").with_level(3).with_item(class.clone());
        (actor, class)
    }

    #[test]
    fn level_up_stops_at_interactive_step_and_completes_after_submit() {
        let (actor, class) = level_three_hero();
        let mut manager = AdvancementManager::for_level_change(actor, 1, context());

        let request = awaiting(manager.begin().unwrap());
        assert_eq!(manager.state(), WorkflowState::AwaitingInput);
        assert_eq!(manager.step_index(), 2);
        assert_eq!(request.item_id, class.id);
        assert_eq!(request.level, 4);
        assert_eq!(manager.clone_character().level, 4);

        let progress = manager.submit(raise(Ability::Str, 2)).unwrap();
        assert_eq!(progress, Progress::ReadyToCommit);
        assert_eq!(manager.state(), WorkflowState::Complete);
        assert_eq!(manager.clone_character().abilities.get(Ability::Str), 12);
        assert_eq!(manager.actor().abilities.get(Ability::Str), 10);
        assert_eq!(manager.actor().level, 3);
    }

    #[test]
    fn invalid_input_is_reported_on_the_same_step() {
        let (actor, _) = level_three_hero();
        let mut manager = AdvancementManager::for_level_change(actor, 1, context());
        manager.begin().unwrap();

        let request = awaiting(manager.submit(raise(Ability::Str, 3)).unwrap());

        assert_eq!(manager.step_index(), 2);
        assert!(request.error.is_some());
        assert!(matches!(
            manager.error(),
            Some(heroes_domain::AdvancementError::PointsExceeded { .. })
        ));
        assert_eq!(manager.clone_character().abilities.get(Ability::Str), 10);
    }

    #[test]
    fn failing_automatic_step_is_downgraded_to_interactive() {
        let focus = AdvancementDefinition::new(
            AdvancementKind::Resource(
                ResourceAdvancement::new("focus", "Focus", ResourceAmount::Fixed { amount: 2 })
                    .recovering(RecoveryPeriod::LongRest, Some("not a formula")),
            ),
            [2],
        );
        let feat = Item::new("Focused", ItemKind::Feat).with_advancement(focus);
        let actor = Character::new("Riley").with_item(feat);
        let mut manager = AdvancementManager::for_level_change(actor, 1, context());
        assert!(manager.steps()[1].automatic);

        let request = awaiting(manager.begin().unwrap());

        assert_eq!(manager.step_index(), 1);
        assert!(!manager.steps()[1].automatic);
        assert_eq!(manager.steps()[1].kind, StepKind::Forward);
        assert!(request.error.is_some());
        assert!(manager.clone_character().resources.is_empty());
    }

    #[test]
    fn failing_restore_is_downgraded_to_forward() {
        let mut hp = HitPointsAdvancement::with_denomination(8);
        hp.value.insert(1, 8);
        let hp = AdvancementDefinition::new(AdvancementKind::HitPoints(hp), [1]);
        let asi = improvement(1);
        let class = Item::new("Smart Hero", ItemKind::Class)
            .with_advancement(hp.clone())
            .with_advancement(asi.clone());
        let actor = Character::new("Riley").with_item(class.clone());

        let mut manager = AdvancementManager::new(actor, context());
        let target = |advancement_id| AdvancementRef {
            item_id: class.id,
            advancement_id,
            level: 1,
        };
        manager.steps = vec![
            AdvancementStep::reverse(target(hp.id)),
            AdvancementStep::restore(target(asi.id), 0),
        ];

        let request = awaiting(manager.begin().unwrap());

        assert_eq!(manager.step_index(), 1);
        assert_eq!(manager.steps()[1].kind, StepKind::Forward);
        assert!(!manager.steps()[1].automatic);
        assert!(matches!(request.retained, Some(RetainedData::Choice(_))));
    }

    #[test]
    fn back_from_first_interactive_step_closes_the_workflow() {
        let (actor, _) = level_three_hero();
        let original = actor.clone();
        let mut manager = AdvancementManager::for_level_change(actor, 1, context());
        manager.begin().unwrap();

        let progress = manager.back().unwrap();

        assert_eq!(progress, Progress::Closed);
        assert_eq!(manager.state(), WorkflowState::Cancelled);
        assert_eq!(manager.clone_character(), &original);
        assert!(matches!(
            manager.submit(raise(Ability::Str, 1)),
            Err(WorkflowError::Cancelled)
        ));
    }

    #[test]
    fn back_re_renders_previous_choice() {
        let class = Item::new("Smart Hero", ItemKind::Class)
            .with_advancement(improvement(2))
            .with_advancement(improvement(3));
        let actor = Character::new("Riley").with_item(class);
        let mut manager = AdvancementManager::for_level_change(actor, 2, context());
        manager.begin().unwrap();
        manager.submit(raise(Ability::Dex, 2)).unwrap();
        assert_eq!(manager.clone_character().abilities.get(Ability::Dex), 12);

        let request = awaiting(manager.back().unwrap());

        assert_eq!(request.level, 2);
        assert_eq!(request.previous_choice(), Some(&raise(Ability::Dex, 2)));
        assert_eq!(manager.clone_character().abilities.get(Ability::Dex), 10);
        assert_eq!(manager.clone_character().level, 2);
    }

    #[test]
    fn restart_returns_to_first_interactive_step_without_old_choices() {
        let class = Item::new("Smart Hero", ItemKind::Class)
            .with_advancement(improvement(2))
            .with_advancement(improvement(3));
        let actor = Character::new("Riley").with_item(class);
        let mut manager = AdvancementManager::for_level_change(actor, 2, context());
        manager.begin().unwrap();
        manager.submit(raise(Ability::Dex, 2)).unwrap();

        let request = awaiting(manager.restart().unwrap());

        assert_eq!(request.level, 2);
        assert_eq!(request.retained, None);
        assert_eq!(manager.step_index(), 1);
        assert_eq!(manager.clone_character().abilities.get(Ability::Dex), 10);
    }

    #[test]
    fn second_workflow_for_the_same_character_is_refused() {
        let (actor, _) = level_three_hero();
        let context = context();
        let mut first = AdvancementManager::for_level_change(actor.clone(), 1, context.clone());
        let mut second = AdvancementManager::for_level_change(actor, 1, context);

        first.begin().unwrap();
        assert!(matches!(
            second.begin(),
            Err(WorkflowError::AlreadyInProgress(_))
        ));

        first.cancel();
        assert!(second.begin().is_ok());
    }

    #[test]
    fn before_render_veto_cancels_and_releases_the_lock() {
        let (actor, _) = level_three_hero();
        let mut hooks = MockAdvancementHooks::new();
        hooks.expect_before_render().times(1).returning(|_, _| false);
        let context = context().with_hooks(Arc::new(hooks));
        let locks = context.locks.clone();
        let id = actor.id;
        let mut manager = AdvancementManager::for_level_change(actor, 1, context);

        assert!(matches!(manager.begin(), Err(WorkflowError::Vetoed)));
        assert_eq!(manager.state(), WorkflowState::Cancelled);
        assert!(!locks.is_locked(id));
    }

    #[test]
    fn begin_without_steps_is_an_invariant_violation() {
        let actor = Character::new("Riley").with_level(10);
        let mut manager = AdvancementManager::for_level_change(actor, 1, context());
        assert!(matches!(manager.begin(), Err(WorkflowError::Invariant(_))));
    }

    #[tokio::test]
    async fn commit_issues_one_call_per_operation() {
        let gear = [
            Item::new("Pistol", ItemKind::Equipment),
            Item::new("Flashlight", ItemKind::Equipment),
        ];
        let grant = AdvancementDefinition::new(
            AdvancementKind::ItemGrant(ItemGrantAdvancement::granting(gear)),
            [2],
        );
        let class = Item::new("Smart Hero", ItemKind::Class)
            .with_advancement(hit_points([1, 2]))
            .with_advancement(grant);
        let background = Item::new("Academic", ItemKind::Background);
        let actor = Character::new("Riley")
            .with_item(class)
            .with_item(background);
        let id = actor.id;

        let mut manager = AdvancementManager::for_level_change(actor, 1, context());
        assert_eq!(manager.begin().unwrap(), Progress::ReadyToCommit);

        let mut store = MockCharacterStore::new();
        store.expect_get().never();
        store
            .expect_update()
            .withf(move |character_id, patch, options| {
                *character_id == id && patch.level == Some(2) && options.is_advancement
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        store
            .expect_create_items()
            .withf(|_, items, _| items.len() == 2)
            .times(1)
            .returning(|_, items, _| Ok(items.iter().map(|item| item.id).collect()));
        store
            .expect_update_items()
            .withf(|_, items, _| items.len() == 2)
            .times(1)
            .returning(|_, _, _| Ok(()));
        store
            .expect_delete_items()
            .withf(|_, ids, _| ids.is_empty())
            .times(1)
            .returning(|_, _, _| Ok(()));

        let summary = manager.complete(&store).await.unwrap().unwrap();

        assert_eq!(summary.level, 2);
        assert_eq!(summary.created.len(), 2);
        assert_eq!(manager.state(), WorkflowState::Committed);
        assert_eq!(manager.actor().level, 2);
    }

    #[tokio::test]
    async fn deleting_an_item_removes_what_it_granted() {
        let mut feat = Item::new("Gearhead", ItemKind::Feat).with_advancement(
            AdvancementDefinition::new(
                AdvancementKind::ItemGrant(ItemGrantAdvancement::granting([Item::new(
                    "Toolkit",
                    ItemKind::Equipment,
                )])),
                [1],
            ),
        );
        feat.advancement.push(AdvancementDefinition::new(
            AdvancementKind::Trait(TraitAdvancement::granting(["tinkerer"])),
            [1],
        ));
        let class = Item::new("Smart Hero", ItemKind::Class);
        let actor = Character::new("Riley").with_item(class);

        let mut adding = AdvancementManager::for_new_item(actor, feat.clone(), context());
        assert_eq!(adding.begin().unwrap(), Progress::ReadyToCommit);
        let with_feat = adding.clone_character().clone();
        drop(adding);
        assert_eq!(with_feat.items.len(), 3);
        assert!(with_feat.traits.contains("tinkerer"));

        let mut deleting = AdvancementManager::for_deleted_item(with_feat, feat.id, context());
        assert_eq!(deleting.steps().last().map(|s| s.kind), Some(StepKind::Delete));
        assert_eq!(deleting.begin().unwrap(), Progress::ReadyToCommit);

        let mut store = MockCharacterStore::new();
        store.expect_update().times(1).returning(|_, _, _| Ok(()));
        store
            .expect_create_items()
            .withf(|_, items, _| items.is_empty())
            .times(1)
            .returning(|_, _, _| Ok(Vec::new()));
        store
            .expect_update_items()
            .withf(|_, items, _| items.len() == 1)
            .times(1)
            .returning(|_, _, _| Ok(()));
        store
            .expect_delete_items()
            .withf(|_, ids, _| ids.len() == 2)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let summary = deleting.complete(&store).await.unwrap().unwrap();
        assert!(summary.deleted.contains(&feat.id));
        assert!(deleting.actor().traits.is_empty());
    }

    /// An item granting Focus and the Alert trait at level 1.
    fn focus_and_alert(name: &str, kind: ItemKind, focus: i32) -> Item {
        Item::new(name, kind)
            .with_advancement(AdvancementDefinition::new(
                AdvancementKind::Resource(ResourceAdvancement::new(
                    "focus",
                    "Focus",
                    ResourceAmount::Fixed { amount: focus },
                )),
                [1],
            ))
            .with_advancement(AdvancementDefinition::new(
                AdvancementKind::Trait(TraitAdvancement::granting(["alert"])),
                [1],
            ))
    }

    fn run_automatic(manager: &mut AdvancementManager) -> Character {
        assert_eq!(manager.begin().unwrap(), Progress::ReadyToCommit);
        let character = manager.clone_character().clone();
        manager.cancel();
        character
    }

    #[test]
    fn deleting_one_item_keeps_what_another_item_still_grants() {
        let class = focus_and_alert("Smart Hero", ItemKind::Class, 2);
        let feat = focus_and_alert("Watchful", ItemKind::Feat, 3);
        let actor = Character::new("Riley");

        let actor = run_automatic(&mut AdvancementManager::for_new_item(actor, class.clone(), context()));
        let actor = run_automatic(&mut AdvancementManager::for_new_item(actor, feat.clone(), context()));
        assert_eq!(actor.resources["focus"].max, 5);

        let without_class =
            run_automatic(&mut AdvancementManager::for_deleted_item(actor, class.id, context()));
        assert_eq!(without_class.resources["focus"].max, 3);
        assert!(without_class.traits.contains("alert"));

        let without_either = run_automatic(&mut AdvancementManager::for_deleted_item(
            without_class,
            feat.id,
            context(),
        ));
        assert!(without_either.resources.is_empty());
        assert!(without_either.traits.is_empty());
    }

    #[test]
    fn item_copied_from_another_character_is_applied_afresh() {
        let feat = Item::new("Athlete", ItemKind::Feat).with_advancement(AdvancementDefinition::new(
            AdvancementKind::AbilityScoreImprovement(
                AbilityScoreAdvancement::improvement(0).with_fixed(Ability::Str, 2),
            ),
            [1],
        ));
        let donor = run_automatic(&mut AdvancementManager::for_new_item(
            Character::new("Sam"),
            feat.clone(),
            context(),
        ));
        let copied = donor.item(feat.id).cloned().unwrap();
        assert!(copied.has_advancement_history());

        let riley = run_automatic(&mut AdvancementManager::for_new_item(
            Character::new("Riley"),
            copied,
            context(),
        ));

        assert_eq!(riley.abilities.get(Ability::Str), 12);
    }

    #[test]
    fn restart_holds_on_a_step_whose_undo_fails() {
        let hp = hit_points([1]);
        let (first, second) = (improvement(1), improvement(1));
        let class = Item::new("Smart Hero", ItemKind::Class)
            .with_advancement(first.clone())
            .with_advancement(hp.clone())
            .with_advancement(second.clone());
        let actor = Character::new("Riley").with_item(class.clone());
        let target = |advancement_id| AdvancementRef {
            item_id: class.id,
            advancement_id,
            level: 1,
        };
        let mut manager = AdvancementManager::new(actor, context());
        manager.steps = vec![
            AdvancementStep::forward(target(first.id), false),
            AdvancementStep::forward(target(hp.id), true),
            AdvancementStep::forward(target(second.id), false),
        ];
        manager.begin().unwrap();
        awaiting(manager.submit(raise(Ability::Str, 2)).unwrap());
        assert_eq!(manager.step_index(), 2);

        // Hit points no longer configured at level 1, so reversing them fails.
        if let Some(definition) = manager
            .clone_mut()
            .item_mut(class.id)
            .and_then(|item| item.advancement_mut(hp.id))
        {
            definition.levels = [2].into_iter().collect();
        }

        awaiting(manager.restart().unwrap());

        assert_eq!(manager.step_index(), 1);
        assert!(!manager.steps()[1].automatic);
        assert!(manager.error().is_some());
        assert_eq!(manager.clone_character().abilities.get(Ability::Str), 12);
    }

    #[tokio::test]
    async fn before_commit_veto_writes_nothing() {
        let class = Item::new("Smart Hero", ItemKind::Class).with_advancement(hit_points([1, 2]));
        let actor = Character::new("Riley").with_item(class);
        let mut hooks = MockAdvancementHooks::new();
        hooks.expect_before_render().returning(|_, _| true);
        hooks.expect_before_commit().times(1).returning(|_, _| false);
        hooks.expect_after_commit().never();
        let mut manager =
            AdvancementManager::for_level_change(actor, 1, context().with_hooks(Arc::new(hooks)));
        manager.begin().unwrap();

        let mut store = MockCharacterStore::new();
        store.expect_update().never();
        store.expect_create_items().never();
        store.expect_update_items().never();
        store.expect_delete_items().never();

        assert_eq!(manager.complete(&store).await.unwrap(), None);
        assert_eq!(manager.state(), WorkflowState::Cancelled);
    }

    #[tokio::test]
    async fn flow_cancel_propagates_as_cancellation() {
        let (actor, _) = level_three_hero();
        let id = actor.id;
        let mut store = MockCharacterStore::new();
        store
            .expect_get()
            .returning(move |_| Ok(Some(actor.clone())));
        store.expect_update().never();
        let mut flow = MockFlowPort::new();
        flow.expect_request()
            .times(1)
            .returning(|_| FlowResponse::Cancel);
        let use_cases = AdvancementUseCases::new(Arc::new(store), Arc::new(flow), context());

        let result = use_cases.change_level(id, 1).await;

        assert!(matches!(result, Err(WorkflowError::Cancelled)));
    }

    #[tokio::test]
    async fn deleting_item_without_history_deletes_directly() {
        let feat = Item::new("Tough", ItemKind::Feat).with_advancement(hit_points([5]));
        let feat_id = feat.id;
        let actor = Character::new("Riley").with_item(feat);
        let id = actor.id;
        let mut store = MockCharacterStore::new();
        store
            .expect_get()
            .returning(move |_| Ok(Some(actor.clone())));
        store
            .expect_delete_items()
            .withf(move |_, ids, options| ids == &vec![feat_id] && !options.is_advancement)
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut flow = MockFlowPort::new();
        flow.expect_request().never();
        let use_cases = AdvancementUseCases::new(Arc::new(store), Arc::new(flow), context());

        let outcome = use_cases.delete_item(id, feat_id).await.unwrap();

        assert!(matches!(
            outcome,
            WorkflowOutcome::Committed(CommitSummary { ref deleted, .. }) if deleted == &vec![feat_id]
        ));
    }

    #[tokio::test]
    async fn missing_character_is_not_found() {
        let mut store = MockCharacterStore::new();
        store.expect_get().returning(|_| Ok(None));
        let use_cases =
            AdvancementUseCases::new(Arc::new(store), Arc::new(MockFlowPort::new()), context());

        let result = use_cases.change_level(CharacterId::new(), 1).await;

        assert!(matches!(
            result,
            Err(WorkflowError::Domain(DomainError::NotFound { .. }))
        ));
    }
}
