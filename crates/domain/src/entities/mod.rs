//! Domain entities - catalog records, features, selections and characters

mod catalog_records;
mod character;
mod derived_state;
mod feature;
mod feature_trait;
mod selection;

pub use catalog_records::{
    AncestryDefinition, BackgroundDefinition, ClassDefinition, FeaturePool, FeatureSource,
    SpellDefinition, SpellSchool, SubclassDefinition,
};
pub use character::{Character, MAX_LEVEL};
pub use derived_state::{DerivedState, DicePoolState, ResourceState};
pub use feature::Feature;
pub use feature_trait::{
    AbilityDefinition, AbilityKind, AttributeBoostTrait, ChoiceKind, DicePoolDefinition,
    FeatureTrait, PickFeatureTrait, Proficiency, ProficiencyKind, ResetPolicy,
    ResourceDefinition, SpellSchoolChoiceTrait, StatBonus, SubclassChoiceTrait,
    UtilitySpellMode, UtilitySpellsTrait,
};
pub use selection::{SelectionStore, TraitSelection};
