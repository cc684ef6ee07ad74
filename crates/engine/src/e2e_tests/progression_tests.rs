//! E2E tests for the main progression scenarios.
//!
//! Tests verify:
//! - Pool picks resolve the choice and fold the picked feature in
//! - Attribute boosts respect the allowed set and add exactly their amount
//! - Resource overrides keep the live value
//! - Full-school grants cannot be duplicated across traits

use charforge_domain::{
    Attribute, CombatStat, DomainError, Feature, FeatureTrait, FlexibleValue, SchoolId, StatBonus,
    StatKey, TraitId, TraitSelection,
};

use super::E2ETestContext;
use crate::test_fixtures::{catalog::sample_bundle, characters, fixed_time};
use crate::use_cases::ChoiceState;

#[test]
fn test_pool_pick_resolves_choice_and_applies_feature() {
    let ctx = E2ETestContext::setup();
    let mut character = characters::berserker(5);

    let before = ctx.status(&character, "berserker_tricks_5").unwrap();
    assert_eq!(before.remaining, 1);
    assert_eq!(before.state, ChoiceState::Available);
    let options = ctx
        .app
        .use_cases
        .availability
        .options(&character, &"berserker_tricks_5".into())
        .unwrap();
    assert_eq!(options.len(), 3);

    let pick = ctx.pool_pick("berserker_tricks_5", "combat_tricks", "whirlwind");
    ctx.choose_all(&mut character, "berserker_tricks_5", vec![pick]);

    let after = ctx.status(&character, "berserker_tricks_5").unwrap();
    assert_eq!(after.remaining, 0);
    assert_eq!(after.state, ChoiceState::Resolved);
    let available = ctx.app.use_cases.availability.available_choices(&character).unwrap();
    assert!(available.find(&"berserker_tricks_5".into()).is_none());

    let state = ctx.derive(&character);
    assert!(state.has_ability("whirlwind"));
    assert_eq!(state.stat_total(&StatKey::combat(CombatStat::Initiative)), 1);
}

#[test]
fn test_attribute_boost_allowed_set_and_amount() {
    let ctx = E2ETestContext::setup();
    let mut character = characters::berserker(4);
    let trait_id = TraitId::from("berserker_boost_4");

    let err = ctx
        .app
        .use_cases
        .selections
        .record_single(
            &mut character,
            &trait_id,
            TraitSelection::attribute_boost("berserker_boost_4", Attribute::Intelligence, 1),
        )
        .unwrap_err();
    assert!(matches!(err, DomainError::SelectionInvalid { .. }));
    assert!(character.selections.is_empty());

    let baseline = ctx.derive(&character);
    ctx.choose(
        &mut character,
        TraitSelection::attribute_boost("berserker_boost_4", Attribute::Strength, 1),
    );
    let boosted = ctx.derive(&character);

    assert_eq!(
        boosted.stat_total(&StatKey::attribute(Attribute::Strength))
            - baseline.stat_total(&StatKey::attribute(Attribute::Strength)),
        1
    );
    assert_eq!(
        boosted.attribute(Attribute::Strength),
        baseline.attribute(Attribute::Strength) + 1
    );
    assert_eq!(
        boosted.attribute(Attribute::Intelligence),
        baseline.attribute(Attribute::Intelligence)
    );
    // fury max reads strength, so the boost flows through the formula too
    assert_eq!(
        boosted.resource(&"fury".into()).unwrap().max,
        baseline.resource(&"fury".into()).unwrap().max + 1
    );
}

#[test]
fn test_resource_override_keeps_live_value() {
    let ctx = E2ETestContext::setup();
    let mut character = characters::mage(4);
    character.set_current_value("mana", 2, fixed_time());

    let low = ctx.derive(&character);
    let mana = low.resource(&"mana".into()).unwrap();
    assert_eq!(mana.max, 6);
    assert_eq!(mana.current, 2);
    assert_eq!(mana.source_feature_id.as_str(), "arcane_training");

    character.set_level(5, fixed_time()).unwrap();
    let high = ctx.derive(&character);
    assert_eq!(high.resources.len(), 1);
    let mana = high.resource(&"mana".into()).unwrap();
    // intelligence * 3 + level
    assert_eq!(mana.max, 14);
    assert_eq!(mana.current, 2);
    assert_eq!(mana.source_feature_id.as_str(), "deep_reserves");
}

#[test]
fn test_untouched_resource_starts_full() {
    let ctx = E2ETestContext::setup();
    let state = ctx.derive(&characters::berserker(7));

    let fury = state.resource(&"fury".into()).unwrap();
    assert_eq!(fury.max, 6);
    assert_eq!(fury.current, 6);
    assert_eq!(fury.source_feature_id.as_str(), "unstoppable");

    let dice = state.dice_pool(&"fury_dice".into()).unwrap();
    assert_eq!(dice.max_dice, 7);
    assert_eq!(dice.definition.die_size, 6);
}

#[test]
fn test_duplicate_full_school_grant_is_rejected() {
    let ctx = E2ETestContext::setup();
    let mut character = characters::mage(8);

    ctx.choose(&mut character, TraitSelection::spell_school("mage_school_1", "fire"));
    ctx.choose_all(
        &mut character,
        "mage_mastery_6",
        vec![TraitSelection::utility_school("mage_mastery_6", "fire")],
    );

    let err = ctx
        .app
        .use_cases
        .selections
        .replace_all(
            &mut character,
            &"mage_mastery_8".into(),
            vec![TraitSelection::utility_school("mage_mastery_8", "fire")],
        )
        .unwrap_err();
    assert!(err.is_selection_invalid());
    assert!(err.to_string().contains("already granted in full"));
    assert_eq!(character.selections.count_for(&"mage_mastery_8".into()), 0);

    let state = ctx.derive(&character);
    for spell in ["kindle", "warmth", "smoke_signal"] {
        assert!(state.has_ability(spell), "missing {}", spell);
    }
    assert!(!state.has_ability("fireball"));
}

#[test]
fn test_mage_build_to_level_eight() {
    let ctx = E2ETestContext::setup();
    let mut character = characters::mage(1).with_ancestry("human");

    ctx.choose(&mut character, TraitSelection::spell_school("mage_school_1", "fire"));
    ctx.choose(
        &mut character,
        TraitSelection::attribute_boost("human_boost", Attribute::Intelligence, 1),
    );
    ctx.choose_all(
        &mut character,
        "mage_utility_1",
        vec![TraitSelection::utility_spell("mage_utility_1", "fire", "kindle")],
    );

    character.set_level(3, fixed_time()).unwrap();
    ctx.choose(&mut character, TraitSelection::subclass("mage_subclass", "flamecaller"));

    character.set_level(5, fixed_time()).unwrap();
    ctx.choose_all(
        &mut character,
        "mage_school_5",
        vec![
            TraitSelection::spell_school("mage_school_5", "ice"),
            TraitSelection::spell_school("mage_school_5", "wind"),
        ],
    );

    // Two more known schools widen the per-school utility choice
    let utility = ctx.status(&character, "mage_utility_1").unwrap();
    assert_eq!(utility.cardinality, 3);
    assert_eq!(utility.state, ChoiceState::PartiallyResolved);
    ctx.choose_all(
        &mut character,
        "mage_utility_1",
        vec![
            TraitSelection::utility_spell("mage_utility_1", "fire", "kindle"),
            TraitSelection::utility_spell("mage_utility_1", "ice", "chill"),
            TraitSelection::utility_spell("mage_utility_1", "wind", "feather_step"),
        ],
    );
    assert_eq!(ctx.state(&character, "mage_utility_1"), ChoiceState::Resolved);

    character.set_level(8, fixed_time()).unwrap();
    ctx.choose_all(
        &mut character,
        "mage_mastery_6",
        vec![TraitSelection::utility_school("mage_mastery_6", "ice")],
    );
    ctx.choose_all(
        &mut character,
        "mage_mastery_8",
        vec![TraitSelection::utility_school("mage_mastery_8", "wind")],
    );

    let state = ctx.derive(&character);
    assert_eq!(state.subclass_id.as_ref().map(|s| s.as_str()), Some("flamecaller"));
    assert_eq!(state.max_spell_tier, 3);
    let known: Vec<_> = state.known_schools.iter().map(SchoolId::as_str).collect();
    assert_eq!(known, vec!["fire", "ice", "wind"]);
    assert_eq!(state.attribute(Attribute::Intelligence), 4);
    // intelligence * 3 + level, with the human boost applied before formulas
    assert_eq!(state.resource(&"mana".into()).unwrap().max, 20);
    assert_eq!(state.stat_total(&StatKey::skill("arcana")), 1);
    for spell in ["kindle", "chill", "feather_step", "whisper_wind"] {
        assert!(state.has_ability(spell), "missing {}", spell);
    }
    assert!(ctx
        .app
        .use_cases
        .availability
        .available_choices(&character)
        .unwrap()
        .is_empty());
}

#[test]
fn test_formula_error_fails_the_derivation() {
    let mut bundle = sample_bundle();
    let broken = Feature::new("broken", 1, "Broken").with_trait(FeatureTrait::StatBonus {
        bonuses: vec![StatBonus::new(
            StatKey::combat(CombatStat::Armor),
            FlexibleValue::formula("charisma + 1"),
        )],
    });
    bundle.backgrounds[0].features.push(broken);
    let ctx = E2ETestContext::with_bundle(bundle);

    let character = characters::berserker(1).with_background("soldier");
    let err = ctx.app.derive(&character).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("broken"), "{}", message);
    assert!(message.contains("charisma"), "{}", message);
}
