//! Charforge domain - the pure data model of character progression.
//!
//! Features and their traits, trait selections, catalog records, characters,
//! derived state, and the flexible-value formula interpreter. No I/O lives
//! here; loading and orchestration belong to the engine crate.

pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use entities::{
    AbilityDefinition, AbilityKind, AncestryDefinition, AttributeBoostTrait, BackgroundDefinition,
    Character, ChoiceKind, ClassDefinition, DerivedState, DicePoolDefinition, DicePoolState,
    Feature, FeaturePool, FeatureSource, FeatureTrait, PickFeatureTrait, Proficiency,
    ProficiencyKind, ResetPolicy, ResourceDefinition, ResourceState, SelectionStore,
    SpellDefinition, SpellSchool, SpellSchoolChoiceTrait, StatBonus, SubclassChoiceTrait,
    SubclassDefinition, TraitSelection, UtilitySpellMode, UtilitySpellsTrait, MAX_LEVEL,
};

pub use error::DomainError;

pub use ids::{
    AbilityId, AncestryId, BackgroundId, CharacterId, ClassId, DicePoolId, FeatureId, PoolId,
    ResourceId, SchoolId, SpellId, SubclassId, TraitId,
};

pub use value_objects::{
    Attribute, CharacterName, CombatStat, EvaluationError, FlexibleValue, Formula,
    FormulaContext, StatKey,
};
