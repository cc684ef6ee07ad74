//! Derived state - the output of aggregation.
//!
//! Recomputed from scratch from the catalog and a character. All collections
//! are ordered so two derivations of the same inputs compare and serialize
//! identically.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::feature_trait::{AbilityDefinition, DicePoolDefinition, Proficiency, ResourceDefinition};
use crate::ids::{CharacterId, ClassId, DicePoolId, FeatureId, ResourceId, SchoolId, SubclassId};
use crate::value_objects::{Attribute, StatKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedState {
    pub character_id: CharacterId,
    pub level: u8,
    pub class_id: ClassId,
    pub subclass_id: Option<SubclassId>,
    /// Summed bonuses per stat
    pub stat_totals: BTreeMap<StatKey, i32>,
    /// Base score plus attribute bonuses
    pub attributes: BTreeMap<Attribute, i32>,
    pub resources: BTreeMap<ResourceId, ResourceState>,
    pub dice_pools: BTreeMap<DicePoolId, DicePoolState>,
    pub known_schools: BTreeSet<SchoolId>,
    pub max_spell_tier: u8,
    pub abilities: Vec<AbilityDefinition>,
    pub proficiencies: BTreeSet<Proficiency>,
    pub resistances: BTreeSet<String>,
}

impl DerivedState {
    /// Total bonus for a stat, 0 when nothing contributes.
    pub fn stat_total(&self, key: &StatKey) -> i32 {
        self.stat_totals.get(key).copied().unwrap_or(0)
    }

    /// Final attribute score.
    pub fn attribute(&self, attribute: Attribute) -> i32 {
        self.attributes.get(&attribute).copied().unwrap_or(0)
    }

    pub fn resource(&self, id: &ResourceId) -> Option<&ResourceState> {
        self.resources.get(id)
    }

    pub fn dice_pool(&self, id: &DicePoolId) -> Option<&DicePoolState> {
        self.dice_pools.get(id)
    }

    pub fn knows_school(&self, id: &SchoolId) -> bool {
        self.known_schools.contains(id)
    }

    pub fn has_ability(&self, name_or_id: &str) -> bool {
        self.abilities
            .iter()
            .any(|a| a.id.as_str() == name_or_id || a.name == name_or_id)
    }
}

/// A resource with its evaluated maximum and live value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceState {
    pub definition: ResourceDefinition,
    pub max: i32,
    /// Stored live value, or `max` when the character has none recorded
    pub current: i32,
    /// Feature whose declaration won
    pub source_feature_id: FeatureId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DicePoolState {
    pub definition: DicePoolDefinition,
    pub max_dice: i32,
    pub current: i32,
    pub source_feature_id: FeatureId,
}
