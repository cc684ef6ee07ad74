//! Catalog records - classes, subclasses, ancestries, backgrounds, feature
//! pools and spell schools.
//!
//! # Simple Data Structs
//!
//! Catalog data is immutable once loaded. Cross-record references (subclass
//! to class, pick trait to pool, school restrictions) are checked when the
//! catalog is built, not here.

use serde::{Deserialize, Serialize};

use super::feature::Feature;
use crate::ids::{
    AncestryId, BackgroundId, ClassId, FeatureId, PoolId, SchoolId, SpellId, SubclassId,
};
use crate::value_objects::Attribute;

/// Shared behaviour of records that grant level-gated features.
pub trait FeatureSource {
    fn features(&self) -> &[Feature];

    /// Features granted at or below `level`, in declaration order.
    fn features_up_to(&self, level: u8) -> Vec<&Feature> {
        self.features()
            .iter()
            .filter(|f| f.is_granted_at(level))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassDefinition {
    pub id: ClassId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Attributes the class favours; informational
    #[serde(default)]
    pub key_attributes: Vec<Attribute>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl ClassDefinition {
    pub fn new(id: impl Into<ClassId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            key_attributes: Vec::new(),
            features: Vec::new(),
        }
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }
}

impl FeatureSource for ClassDefinition {
    fn features(&self) -> &[Feature] {
        &self.features
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubclassDefinition {
    pub id: SubclassId,
    /// The class this subclass specializes
    pub class_id: ClassId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl SubclassDefinition {
    pub fn new(
        id: impl Into<SubclassId>,
        class_id: impl Into<ClassId>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            class_id: class_id.into(),
            name: name.into(),
            description: String::new(),
            features: Vec::new(),
        }
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }
}

impl FeatureSource for SubclassDefinition {
    fn features(&self) -> &[Feature] {
        &self.features
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AncestryDefinition {
    pub id: AncestryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureSource for AncestryDefinition {
    fn features(&self) -> &[Feature] {
        &self.features
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundDefinition {
    pub id: BackgroundId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureSource for BackgroundDefinition {
    fn features(&self) -> &[Feature] {
        &self.features
    }
}

/// A named set of features selectable through `pick_feature_from_pool`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeaturePool {
    pub id: PoolId,
    pub name: String,
    /// Owning class; `None` for pools shared across classes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<ClassId>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeaturePool {
    pub fn new(id: impl Into<PoolId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            class_id: None,
            features: Vec::new(),
        }
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    pub fn feature(&self, feature_id: &FeatureId) -> Option<&Feature> {
        self.features.iter().find(|f| &f.id == feature_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpellSchool {
    pub id: SchoolId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub spells: Vec<SpellDefinition>,
}

impl SpellSchool {
    pub fn new(id: impl Into<SchoolId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            spells: Vec::new(),
        }
    }

    pub fn with_spell(mut self, spell: SpellDefinition) -> Self {
        self.spells.push(spell);
        self
    }

    pub fn spell(&self, spell_id: &SpellId) -> Option<&SpellDefinition> {
        self.spells.iter().find(|s| &s.id == spell_id)
    }

    pub fn utility_spells(&self) -> impl Iterator<Item = &SpellDefinition> {
        self.spells.iter().filter(|s| s.utility)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpellDefinition {
    pub id: SpellId,
    pub name: String,
    /// 0 for cantrips
    #[serde(default)]
    pub tier: u8,
    /// Utility spells are chosen through `utility_spells` traits
    #[serde(default)]
    pub utility: bool,
    #[serde(default)]
    pub description: String,
}

impl SpellDefinition {
    pub fn new(id: impl Into<SpellId>, name: impl Into<String>, tier: u8) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tier,
            utility: false,
            description: String::new(),
        }
    }

    pub fn utility(mut self) -> Self {
        self.utility = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_up_to_respects_level_and_order() {
        let class = ClassDefinition::new("berserker", "Berserker")
            .with_feature(Feature::new("rage", 1, "Rage"))
            .with_feature(Feature::new("frenzy", 3, "Frenzy"))
            .with_feature(Feature::new("thick_skin", 2, "Thick Skin"));

        let ids: Vec<_> = class
            .features_up_to(2)
            .into_iter()
            .map(|f| f.id.as_str())
            .collect();
        assert_eq!(ids, vec!["rage", "thick_skin"]);
    }

    #[test]
    fn school_lookups() {
        let school = SpellSchool::new("fire", "Fire")
            .with_spell(SpellDefinition::new("flame_dart", "Flame Dart", 0))
            .with_spell(SpellDefinition::new("warmth", "Warmth", 0).utility());

        assert!(school.spell(&"warmth".into()).is_some());
        assert!(school.spell(&"ice_shard".into()).is_none());
        let utility: Vec<_> = school.utility_spells().map(|s| s.id.as_str()).collect();
        assert_eq!(utility, vec!["warmth"]);
    }

    #[test]
    fn pool_deserializes_without_owner() {
        let json = r#"{"id":"tricks","name":"Combat Tricks",
            "features":[{"id":"feint","level":1,"name":"Feint"}]}"#;
        let pool: FeaturePool = serde_json::from_str(json).unwrap();
        assert!(pool.class_id.is_none());
        assert!(pool.feature(&"feint".into()).is_some());
    }
}
