//! Effect aggregator - folds every active trait into derived state.
//!
//! Derivation is a pure function of (catalog, character) and always starts
//! from scratch. Features are visited in (level, origin, feature id) order so
//! "later declaration wins" for resources and dice pools does not depend on
//! how the catalog happens to list them. Stat bonuses are only ever summed.
//!
//! Formulas see a two-phase attribute context: base scores plus attribute
//! boosts and fixed attribute bonuses. Formula-valued attribute bonuses count
//! toward the final scores but never feed other formulas.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use charforge_domain::{
    AbilityDefinition, AbilityId, AbilityKind, Attribute, Character, DerivedState, DicePoolId,
    DicePoolState, EvaluationError, FeatureId, FeatureTrait, FlexibleValue, FormulaContext,
    ResourceId, ResourceState, StatKey, TraitSelection,
};

use crate::infrastructure::catalog::ContentCatalog;
use crate::use_cases::reachability::{MissingRecord, Reachability, ReachableFeature};

/// Derivation failures. Formula errors are never replaced by a default.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregationError {
    #[error(transparent)]
    MissingRecord(#[from] MissingRecord),

    #[error("Formula for {target} on feature '{feature_id}' failed: {source}")]
    Evaluation {
        feature_id: FeatureId,
        target: String,
        #[source]
        source: EvaluationError,
    },

    #[error("Total for {target} overflowed while applying {origin}")]
    Overflow { origin: String, target: String },
}

impl AggregationError {
    fn overflow(origin: impl Into<String>, target: impl ToString) -> Self {
        Self::Overflow {
            origin: origin.into(),
            target: target.to_string(),
        }
    }
}

pub struct EffectAggregator {
    catalog: Arc<ContentCatalog>,
}

impl EffectAggregator {
    pub fn new(catalog: Arc<ContentCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ContentCatalog {
        &self.catalog
    }

    /// Derive the character's current state.
    pub fn derive(&self, character: &Character) -> Result<DerivedState, AggregationError> {
        let reach = Reachability::resolve(&self.catalog, character)?;

        let mut features: Vec<&ReachableFeature<'_>> = reach.features().iter().collect();
        features.sort_by(|a, b| {
            (a.feature.level, a.origin.rank(), &a.feature.id).cmp(&(
                b.feature.level,
                b.origin.rank(),
                &b.feature.id,
            ))
        });

        let context = formula_context(character, &features, &reach)?;
        let mut fold = Fold::new(character, &context);

        for reachable in &features {
            for feature_trait in &reachable.feature.traits {
                fold.apply_trait(&reachable.feature.id, feature_trait)?;
            }
        }
        for selection in reach.active_selections() {
            fold.apply_selection(&reach, selection)?;
        }

        let state = fold.finish(&reach)?;
        tracing::debug!(
            character_id = %character.id,
            features = features.len(),
            resources = state.resources.len(),
            abilities = state.abilities.len(),
            "Derived character state"
        );
        Ok(state)
    }
}

/// Add `amount` to the running total for `key`; `None` on overflow, leaving
/// the total untouched.
fn add_checked<K: Ord>(totals: &mut BTreeMap<K, i32>, key: K, amount: i32) -> Option<()> {
    let total = totals.entry(key).or_insert(0);
    *total = total.checked_add(amount)?;
    Some(())
}

/// Phase-one attribute scores used by every formula.
fn formula_context(
    character: &Character,
    features: &[&ReachableFeature<'_>],
    reach: &Reachability<'_>,
) -> Result<FormulaContext, AggregationError> {
    let mut context = character.base_formula_context();

    for reachable in features {
        for feature_trait in &reachable.feature.traits {
            if let FeatureTrait::StatBonus { bonuses } = feature_trait {
                for bonus in bonuses {
                    if let (Some(attribute), FlexibleValue::Fixed { value }) =
                        (bonus.target.as_attribute(), &bonus.value)
                    {
                        add_checked(&mut context.attributes, attribute, *value).ok_or_else(
                            || {
                                let origin = format!("feature '{}'", reachable.feature.id);
                                AggregationError::overflow(origin, &bonus.target)
                            },
                        )?;
                    }
                }
            }
        }
    }
    for selection in reach.active_selections() {
        if let TraitSelection::AttributeBoost {
            granted_by_trait_id,
            attribute,
            amount,
        } = selection
        {
            add_checked(&mut context.attributes, *attribute, *amount).ok_or_else(|| {
                let origin = format!("selection for trait '{}'", granted_by_trait_id);
                AggregationError::overflow(origin, StatKey::attribute(*attribute))
            })?;
        }
    }
    Ok(context)
}

/// Accumulator for one derivation.
struct Fold<'c> {
    character: &'c Character,
    context: &'c FormulaContext,
    stat_totals: BTreeMap<StatKey, i32>,
    resources: BTreeMap<ResourceId, ResourceState>,
    dice_pools: BTreeMap<DicePoolId, DicePoolState>,
    max_spell_tier: u8,
    abilities: Vec<AbilityDefinition>,
    ability_index: BTreeMap<AbilityId, usize>,
    proficiencies: BTreeSet<charforge_domain::Proficiency>,
    resistances: BTreeSet<String>,
}

impl<'c> Fold<'c> {
    fn new(character: &'c Character, context: &'c FormulaContext) -> Self {
        Self {
            character,
            context,
            stat_totals: BTreeMap::new(),
            resources: BTreeMap::new(),
            dice_pools: BTreeMap::new(),
            max_spell_tier: 0,
            abilities: Vec::new(),
            ability_index: BTreeMap::new(),
            proficiencies: BTreeSet::new(),
            resistances: BTreeSet::new(),
        }
    }

    fn evaluate(
        &self,
        value: &FlexibleValue,
        feature_id: &FeatureId,
        target: impl FnOnce() -> String,
    ) -> Result<i32, AggregationError> {
        value
            .evaluate(self.context)
            .map_err(|source| AggregationError::Evaluation {
                feature_id: feature_id.clone(),
                target: target(),
                source,
            })
    }

    fn add_stat(
        &mut self,
        key: &StatKey,
        amount: i32,
        origin: impl FnOnce() -> String,
    ) -> Result<(), AggregationError> {
        add_checked(&mut self.stat_totals, key.clone(), amount)
            .ok_or_else(|| AggregationError::overflow(origin(), key))
    }

    fn add_ability(&mut self, ability: AbilityDefinition) {
        match self.ability_index.get(&ability.id) {
            Some(&index) => self.abilities[index] = ability,
            None => {
                self.ability_index.insert(ability.id.clone(), self.abilities.len());
                self.abilities.push(ability);
            }
        }
    }

    fn apply_trait(
        &mut self,
        feature_id: &FeatureId,
        feature_trait: &FeatureTrait,
    ) -> Result<(), AggregationError> {
        match feature_trait {
            FeatureTrait::Ability { ability } => self.add_ability(ability.clone()),
            FeatureTrait::StatBonus { bonuses } => {
                for bonus in bonuses {
                    let amount =
                        self.evaluate(&bonus.value, feature_id, || bonus.target.to_string())?;
                    self.add_stat(&bonus.target, amount, || format!("feature '{}'", feature_id))?;
                }
            }
            FeatureTrait::Proficiency { proficiencies } => {
                self.proficiencies.extend(proficiencies.iter().cloned());
            }
            FeatureTrait::Resource { resource } => {
                let max = self.evaluate(&resource.max, feature_id, || {
                    format!("resource '{}'", resource.id)
                })?;
                let current = self
                    .character
                    .resource_values
                    .get(&resource.id)
                    .copied()
                    .unwrap_or(max);
                self.resources.insert(
                    resource.id.clone(),
                    ResourceState {
                        definition: resource.clone(),
                        max,
                        current,
                        source_feature_id: feature_id.clone(),
                    },
                );
            }
            FeatureTrait::DicePool { pool } => {
                let max_dice = self.evaluate(&pool.max_dice, feature_id, || {
                    format!("dice pool '{}'", pool.id)
                })?;
                let current = self
                    .character
                    .dice_values
                    .get(&pool.id)
                    .copied()
                    .unwrap_or(max_dice);
                self.dice_pools.insert(
                    pool.id.clone(),
                    DicePoolState {
                        definition: pool.clone(),
                        max_dice,
                        current,
                        source_feature_id: feature_id.clone(),
                    },
                );
            }
            FeatureTrait::SpellTierAccess { max_tier } => {
                self.max_spell_tier = self.max_spell_tier.max(*max_tier);
            }
            FeatureTrait::Resistance { damage_types } => {
                self.resistances
                    .extend(damage_types.iter().map(|d| d.to_lowercase()));
            }
            // Known schools are settled during reachability; choices apply
            // through their selections.
            FeatureTrait::SpellSchool { .. }
            | FeatureTrait::SubclassChoice(_)
            | FeatureTrait::SpellSchoolChoice(_)
            | FeatureTrait::AttributeBoost(_)
            | FeatureTrait::UtilitySpells(_)
            | FeatureTrait::PickFeatureFromPool(_) => {}
        }
        Ok(())
    }

    fn apply_selection(
        &mut self,
        reach: &Reachability<'_>,
        selection: &TraitSelection,
    ) -> Result<(), AggregationError> {
        match selection {
            TraitSelection::AttributeBoost {
                granted_by_trait_id,
                attribute,
                amount,
            } => {
                self.add_stat(&StatKey::attribute(*attribute), *amount, || {
                    format!("selection for trait '{}'", granted_by_trait_id)
                })?;
            }
            TraitSelection::UtilitySpells {
                school_id,
                spell_id,
                ..
            } => {
                let Some(school) = reach.catalog().get_spell_school(school_id) else {
                    return Ok(());
                };
                let spells: Vec<_> = match spell_id {
                    Some(spell_id) => school.spell(spell_id).into_iter().collect(),
                    None => school.utility_spells().collect(),
                };
                for spell in spells {
                    self.add_ability(AbilityDefinition {
                        id: AbilityId::new(spell.id.as_str()),
                        name: spell.name.clone(),
                        description: spell.description.clone(),
                        kind: AbilityKind::Spell,
                        school_id: Some(school.id.clone()),
                    });
                }
            }
            // Applied structurally: subclass and pool features are already
            // walked, chosen schools are already known.
            TraitSelection::Subclass { .. }
            | TraitSelection::SpellSchool { .. }
            | TraitSelection::PoolFeature { .. } => {}
        }
        Ok(())
    }

    fn finish(self, reach: &Reachability<'_>) -> Result<DerivedState, AggregationError> {
        let character = self.character;
        let mut attributes = BTreeMap::new();
        for attribute in Attribute::all() {
            let key = StatKey::attribute(attribute);
            let bonus = self.stat_totals.get(&key).copied().unwrap_or(0);
            let score = character
                .base_attribute(attribute)
                .checked_add(bonus)
                .ok_or_else(|| AggregationError::overflow("base score", &key))?;
            attributes.insert(attribute, score);
        }

        Ok(DerivedState {
            character_id: character.id,
            level: character.level,
            class_id: character.class_id.clone(),
            subclass_id: reach.subclass().map(|s| s.id.clone()),
            stat_totals: self.stat_totals,
            attributes,
            resources: self.resources,
            dice_pools: self.dice_pools,
            known_schools: reach.known_schools().clone(),
            max_spell_tier: self.max_spell_tier,
            abilities: self.abilities,
            proficiencies: self.proficiencies,
            resistances: self.resistances,
        })
    }
}
