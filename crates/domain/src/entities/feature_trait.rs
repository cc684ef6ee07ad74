//! Feature traits - the effects and choice points attached to a feature.
//!
//! `FeatureTrait` is a closed sum type. Every consumer matches it
//! exhaustively, so adding a variant is a compile error at each site that
//! has to learn about it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::ids::{AbilityId, DicePoolId, PoolId, ResourceId, SchoolId, TraitId};
use crate::value_objects::{Attribute, FlexibleValue, StatKey};

/// A single effect or choice point on a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum FeatureTrait {
    /// Grants an action or ability
    Ability { ability: AbilityDefinition },
    /// Attribute / skill / combat stat deltas
    StatBonus { bonuses: Vec<StatBonus> },
    /// Named proficiency grants
    Proficiency { proficiencies: Vec<Proficiency> },
    /// Grants a tracked resource (mana, ki, ...)
    Resource { resource: ResourceDefinition },
    /// Grants a pool of dice
    DicePool { pool: DicePoolDefinition },
    /// Unconditionally grants one spell school
    SpellSchool { school_id: SchoolId },
    /// Raises the maximum castable spell tier
    SpellTierAccess { max_tier: u8 },
    /// Damage resistances
    Resistance { damage_types: Vec<String> },
    /// Choose a subclass
    SubclassChoice(SubclassChoiceTrait),
    /// Choose N spell schools
    SpellSchoolChoice(SpellSchoolChoiceTrait),
    /// Add an amount to one attribute from an allowed set
    AttributeBoost(AttributeBoostTrait),
    /// Choose utility spells
    UtilitySpells(UtilitySpellsTrait),
    /// Choose features from a feature pool
    PickFeatureFromPool(PickFeatureTrait),
}

impl FeatureTrait {
    /// The stable choice id, for choosable variants.
    pub fn choice_id(&self) -> Option<&TraitId> {
        match self {
            FeatureTrait::SubclassChoice(t) => Some(&t.id),
            FeatureTrait::SpellSchoolChoice(t) => Some(&t.id),
            FeatureTrait::AttributeBoost(t) => Some(&t.id),
            FeatureTrait::UtilitySpells(t) => Some(&t.id),
            FeatureTrait::PickFeatureFromPool(t) => Some(&t.id),
            FeatureTrait::Ability { .. }
            | FeatureTrait::StatBonus { .. }
            | FeatureTrait::Proficiency { .. }
            | FeatureTrait::Resource { .. }
            | FeatureTrait::DicePool { .. }
            | FeatureTrait::SpellSchool { .. }
            | FeatureTrait::SpellTierAccess { .. }
            | FeatureTrait::Resistance { .. } => None,
        }
    }

    /// The kind of choice, for choosable variants.
    pub fn choice_kind(&self) -> Option<ChoiceKind> {
        match self {
            FeatureTrait::SubclassChoice(_) => Some(ChoiceKind::Subclass),
            FeatureTrait::SpellSchoolChoice(_) => Some(ChoiceKind::SpellSchool),
            FeatureTrait::AttributeBoost(_) => Some(ChoiceKind::AttributeBoost),
            FeatureTrait::UtilitySpells(_) => Some(ChoiceKind::UtilitySpells),
            FeatureTrait::PickFeatureFromPool(_) => Some(ChoiceKind::PoolFeature),
            FeatureTrait::Ability { .. }
            | FeatureTrait::StatBonus { .. }
            | FeatureTrait::Proficiency { .. }
            | FeatureTrait::Resource { .. }
            | FeatureTrait::DicePool { .. }
            | FeatureTrait::SpellSchool { .. }
            | FeatureTrait::SpellTierAccess { .. }
            | FeatureTrait::Resistance { .. } => None,
        }
    }

    /// Whether this trait requires a player choice.
    pub fn is_choosable(&self) -> bool {
        self.choice_id().is_some()
    }

    /// How many selections this choice accepts.
    ///
    /// `known_schools` feeds the per-school utility spell count. Returns
    /// `None` for traits that are not choices.
    pub fn cardinality(&self, known_schools: &BTreeSet<SchoolId>) -> Option<u32> {
        match self {
            FeatureTrait::SubclassChoice(_) => Some(1),
            FeatureTrait::AttributeBoost(_) => Some(1),
            FeatureTrait::SpellSchoolChoice(t) => Some(u32::from(t.number_of_choices)),
            FeatureTrait::UtilitySpells(t) => Some(t.cardinality(known_schools)),
            FeatureTrait::PickFeatureFromPool(t) => Some(u32::from(t.choices_allowed)),
            FeatureTrait::Ability { .. }
            | FeatureTrait::StatBonus { .. }
            | FeatureTrait::Proficiency { .. }
            | FeatureTrait::Resource { .. }
            | FeatureTrait::DicePool { .. }
            | FeatureTrait::SpellSchool { .. }
            | FeatureTrait::SpellTierAccess { .. }
            | FeatureTrait::Resistance { .. } => None,
        }
    }
}

/// The kind of a choice point; shared by traits and their selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceKind {
    Subclass,
    SpellSchool,
    AttributeBoost,
    UtilitySpells,
    PoolFeature,
}

impl fmt::Display for ChoiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChoiceKind::Subclass => "subclass",
            ChoiceKind::SpellSchool => "spell_school",
            ChoiceKind::AttributeBoost => "attribute_boost",
            ChoiceKind::UtilitySpells => "utility_spells",
            ChoiceKind::PoolFeature => "pool_feature",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Choosable trait payloads
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubclassChoiceTrait {
    pub id: TraitId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellSchoolChoiceTrait {
    pub id: TraitId,
    #[serde(default = "default_one")]
    pub number_of_choices: u8,
    /// Restricted set of schools; empty means any school in the catalog
    #[serde(default)]
    pub schools: Vec<SchoolId>,
}

impl SpellSchoolChoiceTrait {
    /// Whether the school may be picked for this choice.
    pub fn allows(&self, school_id: &SchoolId) -> bool {
        self.schools.is_empty() || self.schools.contains(school_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeBoostTrait {
    pub id: TraitId,
    pub allowed_attributes: Vec<Attribute>,
    /// Signed: negative amounts are penalties
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilitySpellsTrait {
    pub id: TraitId,
    pub selection: UtilitySpellMode,
    /// Schools the spells may come from; empty means any school the
    /// character knows
    #[serde(default)]
    pub eligible_schools: Vec<SchoolId>,
}

impl UtilitySpellsTrait {
    /// Schools this trait may draw from, given what the character knows.
    pub fn eligible_known<'a>(
        &'a self,
        known_schools: &'a BTreeSet<SchoolId>,
    ) -> impl Iterator<Item = &'a SchoolId> + 'a {
        known_schools
            .iter()
            .filter(move |school| {
                self.eligible_schools.is_empty() || self.eligible_schools.contains(school)
            })
    }

    /// Number of selections this trait accepts; zero in every mode until an
    /// eligible school is known.
    pub fn cardinality(&self, known_schools: &BTreeSet<SchoolId>) -> u32 {
        let eligible = self.eligible_known(known_schools).count() as u32;
        if eligible == 0 {
            return 0;
        }
        match self.selection {
            UtilitySpellMode::PerSchool { spells_per_school } => {
                u32::from(spells_per_school) * eligible
            }
            UtilitySpellMode::FullSchool { schools } => u32::from(schools),
            UtilitySpellMode::Count { count } => u32::from(count),
        }
    }
}

/// How utility spells are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum UtilitySpellMode {
    /// N spells from each eligible known school
    PerSchool { spells_per_school: u8 },
    /// Whole schools: every utility spell of each chosen school
    FullSchool {
        #[serde(default = "default_one")]
        schools: u8,
    },
    /// A flat number of spells across the eligible schools
    Count { count: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickFeatureTrait {
    pub id: TraitId,
    pub pool_id: PoolId,
    #[serde(default = "default_one")]
    pub choices_allowed: u8,
}

fn default_one() -> u8 {
    1
}

// =============================================================================
// Effect payloads
// =============================================================================

/// An action, reaction, passive or spell the character can use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityDefinition {
    pub id: AbilityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: AbilityKind,
    /// Set for spells
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_id: Option<SchoolId>,
}

impl AbilityDefinition {
    pub fn new(id: impl Into<AbilityId>, name: impl Into<String>, kind: AbilityKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            kind,
            school_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    #[default]
    Action,
    Reaction,
    Passive,
    Spell,
}

/// One stat delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatBonus {
    pub target: StatKey,
    pub value: FlexibleValue,
}

impl StatBonus {
    pub fn new(target: StatKey, value: impl Into<FlexibleValue>) -> Self {
        Self {
            target,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proficiency {
    pub kind: ProficiencyKind,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProficiencyKind {
    Armor,
    Weapon,
    Skill,
    Save,
    Tool,
    Language,
}

/// When a resource or dice pool refills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Refilled at the end of an encounter
    Encounter,
    /// Restored on a short rest
    ShortRest,
    /// Restored on a safe / long rest
    LongRest,
    /// Never restored automatically (manual tracking)
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub id: ResourceId,
    pub name: String,
    pub reset: ResetPolicy,
    #[serde(default)]
    pub min: i32,
    pub max: FlexibleValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DicePoolDefinition {
    pub id: DicePoolId,
    pub name: String,
    /// Size of each die (6 for d6)
    pub die_size: u8,
    pub max_dice: FlexibleValue,
    pub reset: ResetPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schools(ids: &[&str]) -> BTreeSet<SchoolId> {
        ids.iter().map(|s| SchoolId::from(*s)).collect()
    }

    #[test]
    fn choice_ids_only_on_choosable_variants() {
        let passive = FeatureTrait::SpellTierAccess { max_tier: 1 };
        assert!(!passive.is_choosable());
        assert_eq!(passive.choice_kind(), None);
        assert_eq!(passive.cardinality(&BTreeSet::new()), None);

        let pick = FeatureTrait::PickFeatureFromPool(PickFeatureTrait {
            id: "combat_tricks_1".into(),
            pool_id: "combat_tricks".into(),
            choices_allowed: 2,
        });
        assert_eq!(pick.choice_id().map(TraitId::as_str), Some("combat_tricks_1"));
        assert_eq!(pick.choice_kind(), Some(ChoiceKind::PoolFeature));
        assert_eq!(pick.cardinality(&BTreeSet::new()), Some(2));
    }

    #[test]
    fn per_school_cardinality_counts_eligible_known_schools() {
        let utility = UtilitySpellsTrait {
            id: "utility".into(),
            selection: UtilitySpellMode::PerSchool { spells_per_school: 2 },
            eligible_schools: vec!["fire".into(), "ice".into()],
        };

        assert_eq!(utility.cardinality(&schools(&[])), 0);
        assert_eq!(utility.cardinality(&schools(&["fire"])), 2);
        assert_eq!(utility.cardinality(&schools(&["fire", "ice", "wind"])), 4);
    }

    #[test]
    fn open_eligibility_uses_every_known_school() {
        let utility = UtilitySpellsTrait {
            id: "utility".into(),
            selection: UtilitySpellMode::PerSchool { spells_per_school: 1 },
            eligible_schools: vec![],
        };
        assert_eq!(utility.cardinality(&schools(&["fire", "wind"])), 2);
    }

    #[test]
    fn flat_and_full_school_cardinality() {
        let count = UtilitySpellsTrait {
            id: "u1".into(),
            selection: UtilitySpellMode::Count { count: 3 },
            eligible_schools: vec![],
        };
        let full = UtilitySpellsTrait {
            id: "u2".into(),
            selection: UtilitySpellMode::FullSchool { schools: 1 },
            eligible_schools: vec![],
        };
        assert_eq!(count.cardinality(&schools(&["fire"])), 3);
        assert_eq!(full.cardinality(&schools(&["fire", "ice"])), 1);
    }

    #[test]
    fn every_mode_needs_an_eligible_known_school() {
        for selection in [
            UtilitySpellMode::PerSchool { spells_per_school: 1 },
            UtilitySpellMode::FullSchool { schools: 1 },
            UtilitySpellMode::Count { count: 2 },
        ] {
            let utility = UtilitySpellsTrait {
                id: "utility".into(),
                selection,
                eligible_schools: vec!["radiant".into()],
            };
            assert_eq!(utility.cardinality(&BTreeSet::new()), 0, "{:?}", selection);
            assert_eq!(utility.cardinality(&schools(&["fire"])), 0, "{:?}", selection);
            assert!(utility.cardinality(&schools(&["radiant"])) > 0, "{:?}", selection);
        }
    }

    #[test]
    fn spell_school_choice_restriction() {
        let open = SpellSchoolChoiceTrait {
            id: "school".into(),
            number_of_choices: 1,
            schools: vec![],
        };
        let restricted = SpellSchoolChoiceTrait {
            schools: vec!["fire".into()],
            ..open.clone()
        };
        assert!(open.allows(&"ice".into()));
        assert!(restricted.allows(&"fire".into()));
        assert!(!restricted.allows(&"ice".into()));
    }

    #[test]
    fn deserializes_tagged_variants() {
        let json = r#"[
            {"type":"spell_school","schoolId":"fire"},
            {"type":"attribute_boost","id":"b1",
                "allowedAttributes":["strength","dexterity"],"amount":1},
            {"type":"utility_spells","id":"u1",
                "selection":{"mode":"full_school"},"eligibleSchools":["fire"]},
            {"type":"pick_feature_from_pool","id":"p1","poolId":"tricks"},
            {"type":"resource","resource":{"id":"mana","name":"Mana","reset":"long_rest",
                "max":{"type":"formula","expression":"intelligence * 3 + level"}}}
        ]"#;
        let traits: Vec<FeatureTrait> = serde_json::from_str(json).unwrap();

        assert!(matches!(
            &traits[0],
            FeatureTrait::SpellSchool { school_id } if school_id.as_str() == "fire"
        ));
        assert!(matches!(&traits[1], FeatureTrait::AttributeBoost(t) if t.amount == 1));
        assert!(matches!(
            &traits[2],
            FeatureTrait::UtilitySpells(t)
                if t.selection == UtilitySpellMode::FullSchool { schools: 1 }
        ));
        assert!(matches!(
            &traits[3],
            FeatureTrait::PickFeatureFromPool(t) if t.choices_allowed == 1
        ));
        assert!(matches!(
            &traits[4],
            FeatureTrait::Resource { resource } if resource.min == 0
        ));
    }
}
