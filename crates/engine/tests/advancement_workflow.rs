//! End-to-end advancement workflows against the in-memory store.

use std::collections::BTreeMap;
use std::sync::Arc;

use heroes_domain::advancement::ResourceAmount;
use heroes_domain::{
    derive_character, Ability, AbilityScoreAdvancement, AbilityScoreChoice, AdvancementDefinition,
    AdvancementId, AdvancementInput, AdvancementKind, Character, CharacterId, DefenseAdvancement,
    HitPointsAdvancement, Item, ItemGrantAdvancement, ItemKind, RecoveryPeriod,
    ResourceAdvancement, ScaleValueAdvancement, SystemConfig, TraitAdvancement,
};
use heroes_engine::infrastructure::memory_store::InMemoryCharacterStore;
use heroes_engine::infrastructure::ports::CharacterStore;
use heroes_engine::infrastructure::scripted_flow::ScriptedFlow;
use heroes_engine::use_cases::advancement::{
    AdvancementManager, AdvancementUseCases, ManagerContext, Progress, WorkflowError,
    WorkflowOutcome,
};

struct Hero {
    store: Arc<InMemoryCharacterStore>,
    context: ManagerContext,
    id: CharacterId,
    class: Item,
    improvement_id: AdvancementId,
}

impl Hero {
    fn use_cases(&self, flow: ScriptedFlow) -> AdvancementUseCases {
        AdvancementUseCases::new(self.store.clone(), Arc::new(flow), self.context.clone())
    }

    async fn character(&self) -> Character {
        self.store.get(self.id).await.unwrap().unwrap()
    }

    fn config(&self) -> &SystemConfig {
        &self.context.config
    }
}

fn raise(ability: Ability, by: i32) -> AdvancementInput {
    AdvancementInput::AbilityScores(AbilityScoreChoice {
        assignments: BTreeMap::from([(ability, by)]),
        ..Default::default()
    })
}

fn smart_hero(improvement_id: AdvancementId) -> Item {
    Item::new("Smart Hero", ItemKind::Class)
        .with_advancement(AdvancementDefinition::new(
            AdvancementKind::HitPoints(HitPointsAdvancement::with_denomination(8)),
            1..=10,
        ))
        .with_advancement(AdvancementDefinition::new(
            AdvancementKind::ScaleValue(ScaleValueAdvancement::numbers(
                "focus-points",
                [(1, 2), (3, 3)],
            )),
            [1, 3],
        ))
        .with_advancement(AdvancementDefinition::new(
            AdvancementKind::Resource(
                ResourceAdvancement::new(
                    "focus",
                    "Focus",
                    ResourceAmount::Scale {
                        key: "smart-hero.focus-points".to_string(),
                    },
                )
                .recovering(RecoveryPeriod::ShortRest, Some("1d4")),
            ),
            [1, 3],
        ))
        .with_advancement(
            AdvancementDefinition::new(
                AdvancementKind::AbilityScoreImprovement(AbilityScoreAdvancement::improvement(2)),
                [2],
            )
            .with_id(improvement_id),
        )
}

/// A first-level hero who has just taken the Smart Hero class.
async fn new_hero() -> Hero {
    let store = Arc::new(InMemoryCharacterStore::new());
    let character = Character::new("Riley");
    let id = character.id;
    store.insert(character).await;

    let improvement_id = AdvancementId::new();
    let hero = Hero {
        store,
        context: ManagerContext::new(Arc::new(SystemConfig::everyday_heroes())),
        id,
        class: smart_hero(improvement_id),
        improvement_id,
    };

    let outcome = hero
        .use_cases(ScriptedFlow::default())
        .add_item(id, hero.class.clone())
        .await
        .unwrap();
    assert!(matches!(outcome, WorkflowOutcome::Committed(_)));
    hero
}

/// The same hero taken to third level, improving Intelligence at second.
async fn third_level_hero() -> Hero {
    let hero = new_hero().await;
    let flow = ScriptedFlow::default().with_choice(hero.improvement_id, 2, raise(Ability::Int, 2));
    hero.use_cases(flow).change_level(hero.id, 2).await.unwrap();
    hero
}

#[tokio::test]
async fn adding_a_class_applies_first_level_advancements() {
    let hero = new_hero().await;
    let character = hero.character().await;
    let derived = derive_character(&character, hero.config());

    assert_eq!(character.items.len(), 1);
    assert_eq!(derived.hit_points.max, 8);
    assert_eq!(derived.resources["focus"].max, 2);
    assert_eq!(character.resources["focus"].formula.as_deref(), Some("1d4"));
}

#[tokio::test]
async fn level_up_applies_scripted_choices_and_scaling_resources() {
    let hero = third_level_hero().await;
    let character = hero.character().await;
    let derived = derive_character(&character, hero.config());

    assert_eq!(character.level, 3);
    assert_eq!(character.abilities.get(Ability::Int), 12);
    assert_eq!(derived.hit_points.max, 8 + 5 + 5);
    assert_eq!(derived.resources["focus"].max, 3);
}

#[tokio::test]
async fn level_up_without_a_choice_is_cancelled_and_leaves_the_character_alone() {
    let hero = new_hero().await;
    let before = hero.character().await;

    let result = hero
        .use_cases(ScriptedFlow::default())
        .change_level(hero.id, 1)
        .await;

    assert!(matches!(result, Err(WorkflowError::Cancelled)));
    assert_eq!(hero.character().await, before);
}

#[tokio::test]
async fn level_down_mirrors_level_up() {
    let hero = new_hero().await;
    let before = hero.character().await;
    let flow = ScriptedFlow::default().with_choice(hero.improvement_id, 2, raise(Ability::Int, 2));
    hero.use_cases(flow).change_level(hero.id, 2).await.unwrap();

    let outcome = hero
        .use_cases(ScriptedFlow::default())
        .change_level(hero.id, -2)
        .await
        .unwrap();

    assert!(matches!(outcome, WorkflowOutcome::Committed(_)));
    assert_eq!(hero.character().await, before);
}

#[tokio::test]
async fn modifying_choices_re_prompts_only_the_target_level() {
    let hero = third_level_hero().await;
    let flow = ScriptedFlow::default().with_choice(hero.improvement_id, 2, raise(Ability::Wis, 2));

    hero.use_cases(flow)
        .modify_choices(hero.id, hero.class.id, hero.improvement_id, 2)
        .await
        .unwrap();

    let character = hero.character().await;
    let derived = derive_character(&character, hero.config());
    assert_eq!(character.abilities.get(Ability::Int), 10);
    assert_eq!(character.abilities.get(Ability::Wis), 12);
    assert_eq!(derived.hit_points.max, 18);
    assert_eq!(derived.resources["focus"].max, 3);
}

#[tokio::test]
async fn adding_an_advancement_restores_earlier_choices_without_asking() {
    let hero = third_level_hero().await;
    let analytical = AdvancementDefinition::new(
        AdvancementKind::Trait(TraitAdvancement::granting(["analytical"])),
        [1],
    );
    let guarded = AdvancementDefinition::new(
        AdvancementKind::Defense(DefenseAdvancement::with_bonuses([(2, 1)])),
        [2],
    );

    let outcome = hero
        .use_cases(ScriptedFlow::default())
        .add_advancement(hero.id, hero.class.id, vec![analytical, guarded])
        .await
        .unwrap();

    assert!(matches!(outcome, WorkflowOutcome::Committed(_)));
    let character = hero.character().await;
    let derived = derive_character(&character, hero.config());
    assert!(character.traits.contains("analytical"));
    assert_eq!(character.abilities.get(Ability::Int), 12);
    assert_eq!(derived.defense, 11);
    assert_eq!(character.items[0].advancement.len(), 6);
}

#[tokio::test]
async fn adding_an_advancement_above_the_current_level_updates_the_item_directly() {
    let hero = new_hero().await;
    let later = AdvancementDefinition::new(
        AdvancementKind::Trait(TraitAdvancement::granting(["veteran"])),
        [5],
    );

    hero.use_cases(ScriptedFlow::default())
        .add_advancement(hero.id, hero.class.id, vec![later.clone()])
        .await
        .unwrap();

    let character = hero.character().await;
    assert!(character.items[0].advancement(later.id).is_some());
    assert!(character.traits.is_empty());
}

#[tokio::test]
async fn deleting_an_advancement_reverses_it_everywhere() {
    let hero = third_level_hero().await;

    hero.use_cases(ScriptedFlow::default())
        .delete_advancement(hero.id, hero.class.id, hero.improvement_id)
        .await
        .unwrap();

    let character = hero.character().await;
    assert_eq!(character.abilities.get(Ability::Int), 10);
    assert!(character.items[0].advancement(hero.improvement_id).is_none());
    assert_eq!(character.level, 3);
}

#[tokio::test]
async fn deleting_the_class_reverses_everything_it_granted() {
    let hero = third_level_hero().await;
    let gear = Item::new("Field Kit", ItemKind::Feat).with_advancement(AdvancementDefinition::new(
        AdvancementKind::ItemGrant(ItemGrantAdvancement::granting([Item::new(
            "Flashlight",
            ItemKind::Equipment,
        )])),
        [1],
    ));
    hero.use_cases(ScriptedFlow::default())
        .add_item(hero.id, gear.clone())
        .await
        .unwrap();
    assert_eq!(hero.character().await.items.len(), 3);

    hero.use_cases(ScriptedFlow::default())
        .delete_item(hero.id, gear.id)
        .await
        .unwrap();
    hero.use_cases(ScriptedFlow::default())
        .delete_item(hero.id, hero.class.id)
        .await
        .unwrap();

    let character = hero.character().await;
    assert!(character.items.is_empty());
    assert!(character.resources.is_empty());
    assert_eq!(character.abilities.get(Ability::Int), 10);
    assert_eq!(character.level, 3);
}

#[tokio::test]
async fn level_change_past_the_maximum_has_nothing_to_do() {
    let hero = new_hero().await;
    let max_level = hero.config().max_level;
    let mut character = hero.character().await;
    character.level = max_level;
    hero.store.insert(character).await;

    let outcome = hero
        .use_cases(ScriptedFlow::default())
        .change_level(hero.id, 1)
        .await
        .unwrap();

    assert_eq!(outcome, WorkflowOutcome::NothingToDo);
}

#[tokio::test]
async fn one_workflow_per_character_at_a_time() {
    let hero = new_hero().await;
    let character = hero.character().await;
    let mut first =
        AdvancementManager::for_level_change(character.clone(), 1, hero.context.clone());
    assert!(matches!(first.begin().unwrap(), Progress::AwaitingInput(_)));

    let result = hero
        .use_cases(ScriptedFlow::default())
        .change_level(hero.id, 1)
        .await;
    assert!(matches!(result, Err(WorkflowError::AlreadyInProgress(id)) if id == hero.id));

    first.cancel();
    let flow = ScriptedFlow::default().with_choice(hero.improvement_id, 2, raise(Ability::Str, 1));
    let outcome = hero.use_cases(flow).change_level(hero.id, 1).await.unwrap();
    assert!(matches!(outcome, WorkflowOutcome::Committed(_)));
}
