//! Selection use cases - validated edits to a character's trait selections.
//!
//! Every edit is checked against the catalog and the character's reachable
//! choice points before the store is touched. A rejected edit returns
//! `DomainError::SelectionInvalid` and leaves the character unchanged.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use charforge_domain::{
    Character, DomainError, FeatureId, FeatureTrait, SchoolId, SpellId, TraitId, TraitSelection,
    UtilitySpellMode,
};

use crate::infrastructure::catalog::{ContentCatalog, FeatureOrigin};
use crate::infrastructure::clock::SharedClock;
use crate::use_cases::reachability::{Reachability, ReachableTrait};

pub struct SelectionUseCases {
    catalog: Arc<ContentCatalog>,
    clock: SharedClock,
}

impl SelectionUseCases {
    pub fn new(catalog: Arc<ContentCatalog>, clock: SharedClock) -> Self {
        Self { catalog, clock }
    }

    /// Replace any selections for `trait_id` with exactly one.
    pub fn record_single(
        &self,
        character: &mut Character,
        trait_id: &TraitId,
        selection: TraitSelection,
    ) -> Result<(), DomainError> {
        let mut validated = self.validate(character, trait_id, vec![selection])?;
        let Some(selection) = validated.selections.pop() else {
            return Err(DomainError::selection_invalid(trait_id, "no selection given"));
        };

        character.selections.record_single(trait_id, selection)?;
        character.touch(self.clock.now());
        tracing::info!(
            character_id = %character.id,
            trait_id = %trait_id,
            "Recorded selection"
        );
        Ok(())
    }

    /// Replace every selection for `trait_id`; the only way to edit a
    /// multi-pick choice.
    pub fn replace_all(
        &self,
        character: &mut Character,
        trait_id: &TraitId,
        selections: Vec<TraitSelection>,
    ) -> Result<(), DomainError> {
        let validated = self.validate(character, trait_id, selections)?;
        let count = validated.selections.len();

        character
            .selections
            .replace_all(trait_id, validated.selections, validated.cardinality)?;
        character.touch(self.clock.now());
        tracing::info!(
            character_id = %character.id,
            trait_id = %trait_id,
            count,
            "Replaced selections"
        );
        Ok(())
    }

    /// Clear every selection for `trait_id`. Works for unreachable traits too.
    pub fn remove(&self, character: &mut Character, trait_id: &TraitId) -> usize {
        let removed = character.selections.remove(trait_id);
        if removed > 0 {
            character.touch(self.clock.now());
            tracing::info!(
                character_id = %character.id,
                trait_id = %trait_id,
                removed,
                "Removed selections"
            );
        }
        removed
    }

    /// Drop selections whose granting trait is no longer reachable.
    ///
    /// Repeats until stable, since dropping a subclass can orphan the
    /// selections made on that subclass's features.
    pub fn prune_orphaned(&self, character: &mut Character) -> Result<usize, DomainError> {
        let mut total = 0;
        loop {
            let reachable: BTreeSet<TraitId> = {
                let reach = Reachability::resolve(&self.catalog, character)
                    .map_err(|e| DomainError::validation(e.to_string()))?;
                reach.choices().map(|c| c.id.clone()).collect()
            };

            let removed = character
                .selections
                .retain(|s| reachable.contains(s.granted_by()));
            if removed == 0 {
                break;
            }
            total += removed;
        }

        if total > 0 {
            character.touch(self.clock.now());
            tracing::info!(
                character_id = %character.id,
                removed = total,
                "Pruned orphaned selections"
            );
        }
        Ok(total)
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    fn validate(
        &self,
        character: &Character,
        trait_id: &TraitId,
        selections: Vec<TraitSelection>,
    ) -> Result<Validated, DomainError> {
        let reach = Reachability::resolve(&self.catalog, character)
            .map_err(|e| DomainError::selection_invalid(trait_id, e.to_string()))?;
        let choice = reach
            .choice(trait_id)
            .ok_or_else(|| DomainError::selection_invalid(trait_id, "trait is not reachable"))?;
        let cardinality = reach.cardinality(choice);

        if selections.len() as u64 > u64::from(cardinality) {
            return Err(DomainError::selection_invalid(
                trait_id,
                format!(
                    "{} selections exceed the allowed {}",
                    selections.len(),
                    cardinality
                ),
            ));
        }
        for selection in &selections {
            if selection.granted_by() != trait_id {
                return Err(DomainError::selection_invalid(
                    trait_id,
                    format!("selection is keyed to trait '{}'", selection.granted_by()),
                ));
            }
            if selection.kind() != choice.kind {
                return Err(DomainError::selection_invalid(
                    trait_id,
                    format!("expected a {} selection, got {}", choice.kind, selection.kind()),
                ));
            }
        }

        let check = Check {
            reach: &reach,
            choice,
            trait_id,
        };
        let selections = match choice.feature_trait {
            FeatureTrait::SubclassChoice(_) => check.subclass(selections)?,
            FeatureTrait::AttributeBoost(_) => check.attribute_boost(selections)?,
            FeatureTrait::SpellSchoolChoice(_) => check.spell_school(selections)?,
            FeatureTrait::UtilitySpells(_) => check.utility_spells(selections)?,
            FeatureTrait::PickFeatureFromPool(_) => check.pool_features(selections)?,
            FeatureTrait::Ability { .. }
            | FeatureTrait::StatBonus { .. }
            | FeatureTrait::Proficiency { .. }
            | FeatureTrait::Resource { .. }
            | FeatureTrait::DicePool { .. }
            | FeatureTrait::SpellSchool { .. }
            | FeatureTrait::SpellTierAccess { .. }
            | FeatureTrait::Resistance { .. } => {
                return Err(DomainError::selection_invalid(trait_id, "trait is not a choice"))
            }
        };

        Ok(Validated {
            selections,
            cardinality,
        })
    }
}

/// Selections that passed their trait's checks, possibly normalized.
type Checked = Result<Vec<TraitSelection>, DomainError>;

struct Validated {
    selections: Vec<TraitSelection>,
    cardinality: u32,
}

/// Per-kind checks against one reachable choice.
struct Check<'r, 'a> {
    reach: &'r Reachability<'a>,
    choice: &'r ReachableTrait<'a>,
    trait_id: &'r TraitId,
}

impl Check<'_, '_> {
    fn reject(&self, reason: impl Into<String>) -> DomainError {
        DomainError::selection_invalid(self.trait_id, reason)
    }

    fn subclass(&self, selections: Vec<TraitSelection>) -> Checked {
        let character = self.reach.character();
        for selection in &selections {
            if let TraitSelection::Subclass { subclass_id, .. } = selection {
                let subclass = self
                    .reach
                    .catalog()
                    .get_subclass_definition(subclass_id)
                    .ok_or_else(|| self.reject(format!("unknown subclass '{}'", subclass_id)))?;
                if subclass.class_id != character.class_id {
                    return Err(self.reject(format!(
                        "subclass '{}' belongs to class '{}'",
                        subclass_id, subclass.class_id
                    )));
                }
            }
        }
        Ok(selections)
    }

    fn attribute_boost(&self, selections: Vec<TraitSelection>) -> Checked {
        let FeatureTrait::AttributeBoost(boost) = self.choice.feature_trait else {
            return Err(self.reject("trait is not an attribute boost"));
        };
        for selection in &selections {
            if let TraitSelection::AttributeBoost { attribute, amount, .. } = selection {
                if !boost.allowed_attributes.contains(attribute) {
                    return Err(self.reject(format!("attribute '{}' is not allowed", attribute)));
                }
                if *amount != boost.amount {
                    return Err(self.reject(format!(
                        "amount {} does not match the trait amount {}",
                        amount, boost.amount
                    )));
                }
            }
        }
        Ok(selections)
    }

    fn spell_school(&self, selections: Vec<TraitSelection>) -> Checked {
        let FeatureTrait::SpellSchoolChoice(school_choice) = self.choice.feature_trait else {
            return Err(self.reject("trait is not a spell school choice"));
        };
        let mut seen: BTreeSet<&SchoolId> = BTreeSet::new();
        for selection in &selections {
            if let TraitSelection::SpellSchool { school_id, .. } = selection {
                if self.reach.catalog().get_spell_school(school_id).is_none() {
                    return Err(self.reject(format!("unknown spell school '{}'", school_id)));
                }
                if !school_choice.allows(school_id) {
                    return Err(self.reject(format!("spell school '{}' is not allowed", school_id)));
                }
                if !seen.insert(school_id) {
                    return Err(self.reject(format!("spell school '{}' chosen twice", school_id)));
                }
            }
        }
        Ok(selections)
    }

    fn utility_spells(&self, selections: Vec<TraitSelection>) -> Checked {
        let FeatureTrait::UtilitySpells(utility) = self.choice.feature_trait else {
            return Err(self.reject("trait is not a utility spell choice"));
        };
        let catalog = self.reach.catalog();
        let known = self.reach.known_schools();
        let full_school_elsewhere = self.full_school_grants_elsewhere();

        let mut schools_seen: BTreeSet<&SchoolId> = BTreeSet::new();
        let mut spells_seen: BTreeSet<(&SchoolId, &SpellId)> = BTreeSet::new();
        let mut per_school: BTreeMap<&SchoolId, u32> = BTreeMap::new();

        for selection in &selections {
            let TraitSelection::UtilitySpells { school_id, spell_id, .. } = selection else {
                continue;
            };
            if catalog.get_spell_school(school_id).is_none() {
                return Err(self.reject(format!("unknown spell school '{}'", school_id)));
            }
            if !utility.eligible_known(known).any(|s| s == school_id) {
                return Err(self.reject(format!(
                    "spell school '{}' is not known or not eligible",
                    school_id
                )));
            }

            match (utility.selection, spell_id) {
                (UtilitySpellMode::FullSchool { .. }, Some(_)) => {
                    return Err(
                        self.reject("full-school mode grants whole schools, not single spells")
                    );
                }
                (UtilitySpellMode::FullSchool { .. }, None) => {
                    if full_school_elsewhere.contains(school_id) {
                        return Err(self.reject(format!(
                            "spell school '{}' is already granted in full by another trait",
                            school_id
                        )));
                    }
                    if !schools_seen.insert(school_id) {
                        let reason = format!("spell school '{}' chosen twice", school_id);
                        return Err(self.reject(reason));
                    }
                }
                (_, None) => return Err(self.reject("a spell must be chosen")),
                (mode, Some(spell_id)) => {
                    let spell = catalog
                        .get_spell(school_id, spell_id)
                        .ok_or_else(|| {
                            self.reject(format!("unknown spell '{}' in '{}'", spell_id, school_id))
                        })?;
                    if !spell.utility {
                        let reason = format!("spell '{}' is not a utility spell", spell_id);
                        return Err(self.reject(reason));
                    }
                    if !spells_seen.insert((school_id, spell_id)) {
                        return Err(self.reject(format!("spell '{}' chosen twice", spell_id)));
                    }
                    let count = per_school.entry(school_id).or_insert(0);
                    *count += 1;
                    if let UtilitySpellMode::PerSchool { spells_per_school } = mode {
                        if *count > u32::from(spells_per_school) {
                            return Err(self.reject(format!(
                                "at most {} spells from '{}'",
                                spells_per_school, school_id
                            )));
                        }
                    }
                }
            }
        }
        Ok(selections)
    }

    /// Schools already granted in full by other reachable traits.
    fn full_school_grants_elsewhere(&self) -> BTreeSet<SchoolId> {
        self.reach
            .active_selections()
            .filter(|s| s.granted_by() != self.trait_id)
            .filter_map(|s| match s {
                TraitSelection::UtilitySpells {
                    school_id,
                    spell_id: None,
                    ..
                } => Some(school_id.clone()),
                _ => None,
            })
            .collect()
    }

    fn pool_features(&self, selections: Vec<TraitSelection>) -> Checked {
        let FeatureTrait::PickFeatureFromPool(pick) = self.choice.feature_trait else {
            return Err(self.reject("trait is not a pool pick"));
        };
        let pool = self
            .reach
            .catalog()
            .get_feature_pool(&pick.pool_id)
            .ok_or_else(|| self.reject(format!("unknown pool '{}'", pick.pool_id)))?;
        let level = self.reach.character().level;

        let taken_elsewhere: BTreeSet<&FeatureId> = self
            .reach
            .features()
            .iter()
            .filter(|f| f.picked_by.is_some_and(|t| t != self.trait_id))
            .filter(|f| matches!(&f.origin, FeatureOrigin::Pool(p) if p == &pick.pool_id))
            .map(|f| &f.feature.id)
            .collect();

        let mut seen: BTreeSet<FeatureId> = BTreeSet::new();
        let mut normalized = Vec::with_capacity(selections.len());
        for selection in selections {
            let TraitSelection::PoolFeature { feature, .. } = selection else {
                continue;
            };
            let catalog_feature = pool
                .feature(&feature.id)
                .ok_or_else(|| {
                    self.reject(format!("feature '{}' is not in pool '{}'", feature.id, pool.id))
                })?;
            if catalog_feature.level > level {
                return Err(self.reject(format!(
                    "feature '{}' requires level {}",
                    feature.id, catalog_feature.level
                )));
            }
            if taken_elsewhere.contains(&feature.id) {
                return Err(self.reject(format!(
                    "feature '{}' is already picked from '{}'",
                    feature.id, pool.id
                )));
            }
            if !seen.insert(feature.id.clone()) {
                return Err(self.reject(format!("feature '{}' chosen twice", feature.id)));
            }
            normalized.push(TraitSelection::pool_feature(
                self.trait_id.clone(),
                catalog_feature.clone(),
            ));
        }
        Ok(normalized)
    }
}
