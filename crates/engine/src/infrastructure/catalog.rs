//! Content catalog - the validated, read-only registry of catalog records.
//!
//! Built once from a [`CatalogBundle`] at startup and shared behind an `Arc`
//! for the rest of the process. Lookups return `None` for unknown ids.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use charforge_domain::{
    AncestryDefinition, AncestryId, BackgroundDefinition, BackgroundId, ClassDefinition, ClassId,
    Feature, FeatureId, FeaturePool, FeatureTrait, PoolId, SchoolId, SpellDefinition, SpellId,
    SpellSchool, SubclassDefinition, SubclassId, TraitId,
};

use crate::infrastructure::ports::CatalogSourceError;

// =============================================================================
// Bundle
// =============================================================================

/// Raw catalog records as they come from a content source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogBundle {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub classes: Vec<ClassDefinition>,
    #[serde(default)]
    pub subclasses: Vec<SubclassDefinition>,
    #[serde(default)]
    pub ancestries: Vec<AncestryDefinition>,
    #[serde(default)]
    pub backgrounds: Vec<BackgroundDefinition>,
    #[serde(default)]
    pub pools: Vec<FeaturePool>,
    #[serde(default)]
    pub schools: Vec<SpellSchool>,
}

impl CatalogBundle {
    /// Append another bundle's records. Versions are joined with `+`;
    /// duplicate ids are caught when the catalog is built.
    pub fn merge(mut self, other: CatalogBundle) -> Self {
        self.version = match (self.version.is_empty(), other.version.is_empty()) {
            (true, _) => other.version,
            (false, true) => self.version,
            (false, false) => format!("{}+{}", self.version, other.version),
        };
        self.classes.extend(other.classes);
        self.subclasses.extend(other.subclasses);
        self.ancestries.extend(other.ancestries);
        self.backgrounds.extend(other.backgrounds);
        self.pools.extend(other.pools);
        self.schools.extend(other.schools);
        self
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Catalog content that cannot be loaded or fails validation.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog source error: {0}")]
    Source(#[from] CatalogSourceError),

    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("Trait id '{trait_id}' is declared by both {first} and {second}")]
    DuplicateTraitId {
        trait_id: TraitId,
        first: String,
        second: String,
    },

    #[error("{owner} references unknown class '{class_id}'")]
    UnknownClass { owner: String, class_id: ClassId },

    #[error("Trait '{trait_id}' references unknown pool '{pool_id}'")]
    UnknownPool { trait_id: TraitId, pool_id: PoolId },

    #[error("Feature '{feature_id}' references unknown spell school '{school_id}'")]
    UnknownSchool {
        feature_id: FeatureId,
        school_id: SchoolId,
    },

    #[error("Pool '{pool_id}' feature '{feature_id}' picks from another pool")]
    NestedPoolPick { pool_id: PoolId, feature_id: FeatureId },

    #[error("Invalid feature '{feature_id}': {reason}")]
    InvalidFeature { feature_id: FeatureId, reason: String },
}

impl CatalogError {
    fn duplicate(kind: &'static str, id: impl fmt::Display) -> Self {
        Self::DuplicateId {
            kind,
            id: id.to_string(),
        }
    }

    fn invalid_feature(feature: &Feature, reason: impl Into<String>) -> Self {
        Self::InvalidFeature {
            feature_id: feature.id.clone(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Feature origins
// =============================================================================

/// Where a feature comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum FeatureOrigin {
    Class(ClassId),
    Subclass(SubclassId),
    Ancestry(AncestryId),
    Background(BackgroundId),
    Pool(PoolId),
}

impl FeatureOrigin {
    /// Tie-break rank used to order features granted at the same level.
    pub fn rank(&self) -> u8 {
        match self {
            FeatureOrigin::Class(_) => 0,
            FeatureOrigin::Subclass(_) => 1,
            FeatureOrigin::Ancestry(_) => 2,
            FeatureOrigin::Background(_) => 3,
            FeatureOrigin::Pool(_) => 4,
        }
    }
}

impl fmt::Display for FeatureOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureOrigin::Class(id) => write!(f, "class '{}'", id),
            FeatureOrigin::Subclass(id) => write!(f, "subclass '{}'", id),
            FeatureOrigin::Ancestry(id) => write!(f, "ancestry '{}'", id),
            FeatureOrigin::Background(id) => write!(f, "background '{}'", id),
            FeatureOrigin::Pool(id) => write!(f, "pool '{}'", id),
        }
    }
}

/// Catalog location of a choosable trait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitLocation {
    pub origin: FeatureOrigin,
    pub feature_id: FeatureId,
    pub feature_level: u8,
}

// =============================================================================
// Catalog
// =============================================================================

/// Validated, indexed catalog.
#[derive(Debug, Clone, Default)]
pub struct ContentCatalog {
    version: String,
    classes: BTreeMap<ClassId, ClassDefinition>,
    subclasses: BTreeMap<SubclassId, SubclassDefinition>,
    ancestries: BTreeMap<AncestryId, AncestryDefinition>,
    backgrounds: BTreeMap<BackgroundId, BackgroundDefinition>,
    pools: BTreeMap<PoolId, FeaturePool>,
    schools: BTreeMap<SchoolId, SpellSchool>,
    trait_index: HashMap<TraitId, TraitLocation>,
}

impl ContentCatalog {
    /// Validate and index a bundle.
    pub fn from_bundle(bundle: CatalogBundle) -> Result<Self, CatalogError> {
        let mut catalog = ContentCatalog {
            version: bundle.version,
            ..Default::default()
        };

        for class in bundle.classes {
            insert_unique(&mut catalog.classes, class.id.clone(), class, "class")?;
        }
        for subclass in bundle.subclasses {
            insert_unique(&mut catalog.subclasses, subclass.id.clone(), subclass, "subclass")?;
        }
        for ancestry in bundle.ancestries {
            insert_unique(&mut catalog.ancestries, ancestry.id.clone(), ancestry, "ancestry")?;
        }
        for background in bundle.backgrounds {
            let id = background.id.clone();
            insert_unique(&mut catalog.backgrounds, id, background, "background")?;
        }
        for pool in bundle.pools {
            insert_unique(&mut catalog.pools, pool.id.clone(), pool, "pool")?;
        }
        for school in bundle.schools {
            insert_unique(&mut catalog.schools, school.id.clone(), school, "spell school")?;
        }

        catalog.validate_references()?;
        catalog.trait_index = catalog.build_trait_index()?;
        Ok(catalog)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn get_class_definition(&self, id: &ClassId) -> Option<&ClassDefinition> {
        self.classes.get(id)
    }

    pub fn get_subclass_definition(&self, id: &SubclassId) -> Option<&SubclassDefinition> {
        self.subclasses.get(id)
    }

    pub fn get_ancestry_definition(&self, id: &AncestryId) -> Option<&AncestryDefinition> {
        self.ancestries.get(id)
    }

    pub fn get_background_definition(
        &self,
        id: &BackgroundId,
    ) -> Option<&BackgroundDefinition> {
        self.backgrounds.get(id)
    }

    pub fn get_feature_pool(&self, id: &PoolId) -> Option<&FeaturePool> {
        self.pools.get(id)
    }

    pub fn get_spell_school(&self, id: &SchoolId) -> Option<&SpellSchool> {
        self.schools.get(id)
    }

    pub fn get_spell(
        &self,
        school_id: &SchoolId,
        spell_id: &SpellId,
    ) -> Option<&SpellDefinition> {
        self.get_spell_school(school_id).and_then(|s| s.spell(spell_id))
    }

    pub fn subclasses_of<'a>(
        &'a self,
        class_id: &'a ClassId,
    ) -> impl Iterator<Item = &'a SubclassDefinition> + 'a {
        self.subclasses.values().filter(move |s| &s.class_id == class_id)
    }

    pub fn schools(&self) -> impl Iterator<Item = &SpellSchool> {
        self.schools.values()
    }

    /// Where a choosable trait is declared, if anywhere.
    pub fn locate_trait(&self, trait_id: &TraitId) -> Option<&TraitLocation> {
        self.trait_index.get(trait_id)
    }

    /// Record counts, for logging.
    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            classes: self.classes.len(),
            subclasses: self.subclasses.len(),
            ancestries: self.ancestries.len(),
            backgrounds: self.backgrounds.len(),
            pools: self.pools.len(),
            schools: self.schools.len(),
            choice_traits: self.trait_index.len(),
        }
    }

    /// Every feature in the catalog with its origin.
    fn all_features(&self) -> impl Iterator<Item = (FeatureOrigin, &Feature)> {
        let classes = self.classes.values().flat_map(|c| {
            c.features
                .iter()
                .map(move |f| (FeatureOrigin::Class(c.id.clone()), f))
        });
        let subclasses = self.subclasses.values().flat_map(|s| {
            s.features
                .iter()
                .map(move |f| (FeatureOrigin::Subclass(s.id.clone()), f))
        });
        let ancestries = self.ancestries.values().flat_map(|a| {
            a.features
                .iter()
                .map(move |f| (FeatureOrigin::Ancestry(a.id.clone()), f))
        });
        let backgrounds = self.backgrounds.values().flat_map(|b| {
            b.features
                .iter()
                .map(move |f| (FeatureOrigin::Background(b.id.clone()), f))
        });
        let pools = self.pools.values().flat_map(|p| {
            p.features
                .iter()
                .map(move |f| (FeatureOrigin::Pool(p.id.clone()), f))
        });
        classes
            .chain(subclasses)
            .chain(ancestries)
            .chain(backgrounds)
            .chain(pools)
    }

    fn validate_references(&self) -> Result<(), CatalogError> {
        for subclass in self.subclasses.values() {
            if !self.classes.contains_key(&subclass.class_id) {
                return Err(CatalogError::UnknownClass {
                    owner: format!("subclass '{}'", subclass.id),
                    class_id: subclass.class_id.clone(),
                });
            }
        }
        for pool in self.pools.values() {
            if let Some(class_id) = &pool.class_id {
                if !self.classes.contains_key(class_id) {
                    return Err(CatalogError::UnknownClass {
                        owner: format!("pool '{}'", pool.id),
                        class_id: class_id.clone(),
                    });
                }
            }
        }

        for (origin, feature) in self.all_features() {
            if feature.level == 0 {
                return Err(CatalogError::invalid_feature(feature, "level must be at least 1"));
            }
            for feature_trait in &feature.traits {
                self.validate_trait(&origin, feature, feature_trait)?;
            }
        }
        Ok(())
    }

    fn validate_trait(
        &self,
        origin: &FeatureOrigin,
        feature: &Feature,
        feature_trait: &FeatureTrait,
    ) -> Result<(), CatalogError> {
        let check_school = |school_id: &SchoolId| {
            if self.schools.contains_key(school_id) {
                Ok(())
            } else {
                Err(CatalogError::UnknownSchool {
                    feature_id: feature.id.clone(),
                    school_id: school_id.clone(),
                })
            }
        };

        match feature_trait {
            FeatureTrait::SpellSchool { school_id } => check_school(school_id),
            FeatureTrait::SpellSchoolChoice(choice) => {
                if choice.number_of_choices == 0 {
                    return Err(CatalogError::invalid_feature(
                        feature,
                        format!("spell school choice '{}' allows no picks", choice.id),
                    ));
                }
                choice.schools.iter().try_for_each(check_school)
            }
            FeatureTrait::UtilitySpells(utility) => {
                utility.eligible_schools.iter().try_for_each(check_school)
            }
            FeatureTrait::PickFeatureFromPool(pick) => {
                if let FeatureOrigin::Pool(pool_id) = origin {
                    return Err(CatalogError::NestedPoolPick {
                        pool_id: pool_id.clone(),
                        feature_id: feature.id.clone(),
                    });
                }
                if !self.pools.contains_key(&pick.pool_id) {
                    return Err(CatalogError::UnknownPool {
                        trait_id: pick.id.clone(),
                        pool_id: pick.pool_id.clone(),
                    });
                }
                Ok(())
            }
            FeatureTrait::AttributeBoost(boost) => {
                if boost.allowed_attributes.is_empty() {
                    return Err(CatalogError::invalid_feature(
                        feature,
                        format!("attribute boost '{}' allows no attributes", boost.id),
                    ));
                }
                Ok(())
            }
            FeatureTrait::DicePool { pool } => {
                if pool.die_size < 2 {
                    return Err(CatalogError::invalid_feature(
                        feature,
                        format!("dice pool '{}' has die size {}", pool.id, pool.die_size),
                    ));
                }
                Ok(())
            }
            FeatureTrait::Ability { .. }
            | FeatureTrait::StatBonus { .. }
            | FeatureTrait::Proficiency { .. }
            | FeatureTrait::Resource { .. }
            | FeatureTrait::SpellTierAccess { .. }
            | FeatureTrait::Resistance { .. }
            | FeatureTrait::SubclassChoice(_) => Ok(()),
        }
    }

    fn build_trait_index(&self) -> Result<HashMap<TraitId, TraitLocation>, CatalogError> {
        let mut index: HashMap<TraitId, TraitLocation> = HashMap::new();
        for (origin, feature) in self.all_features() {
            for trait_id in feature.choice_traits().filter_map(FeatureTrait::choice_id) {
                let location = TraitLocation {
                    origin: origin.clone(),
                    feature_id: feature.id.clone(),
                    feature_level: feature.level,
                };
                if let Some(existing) = index.get(trait_id) {
                    return Err(CatalogError::DuplicateTraitId {
                        trait_id: trait_id.clone(),
                        first: format!("{} feature '{}'", existing.origin, existing.feature_id),
                        second: format!("{} feature '{}'", location.origin, location.feature_id),
                    });
                }
                index.insert(trait_id.clone(), location);
            }
        }
        Ok(index)
    }
}

/// Record counts of a loaded catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSummary {
    pub classes: usize,
    pub subclasses: usize,
    pub ancestries: usize,
    pub backgrounds: usize,
    pub pools: usize,
    pub schools: usize,
    pub choice_traits: usize,
}

fn insert_unique<K: Ord + fmt::Display, V>(
    map: &mut BTreeMap<K, V>,
    key: K,
    value: V,
    kind: &'static str,
) -> Result<(), CatalogError> {
    if map.contains_key(&key) {
        return Err(CatalogError::duplicate(kind, &key));
    }
    map.insert(key, value);
    Ok(())
}
