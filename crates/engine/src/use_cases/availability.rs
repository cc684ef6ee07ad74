//! Availability resolver - which choices a character can still make.
//!
//! Pure reads over the catalog and a character. A choice whose prerequisite
//! is unmet (its feature is above the character's level, its subclass is not
//! chosen, or it has nothing to pick from yet) is not listed at all.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use charforge_domain::{
    Attribute, Character, ChoiceKind, FeatureId, FeatureTrait, TraitId, TraitSelection,
    UtilitySpellMode,
};

use crate::infrastructure::catalog::{ContentCatalog, FeatureOrigin};
use crate::use_cases::reachability::{MissingRecord, Reachability, ReachableTrait};

/// Lifecycle state of one choice point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceState {
    /// Prerequisite unmet
    Locked,
    /// Nothing chosen yet
    Available,
    /// Some but not all picks of a multi-pick choice made
    PartiallyResolved,
    /// Every pick made
    Resolved,
}

impl ChoiceState {
    fn from_counts(selected: u32, cardinality: u32) -> Self {
        if cardinality == 0 {
            ChoiceState::Locked
        } else if selected == 0 {
            ChoiceState::Available
        } else if selected < cardinality {
            ChoiceState::PartiallyResolved
        } else {
            ChoiceState::Resolved
        }
    }
}

/// Status of one reachable choice point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableChoice {
    pub trait_id: TraitId,
    pub kind: ChoiceKind,
    pub feature_id: FeatureId,
    pub feature_name: String,
    pub origin: FeatureOrigin,
    pub cardinality: u32,
    pub selected: u32,
    pub remaining: u32,
    pub state: ChoiceState,
    pub feature_trait: FeatureTrait,
}

/// Choices with picks remaining, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableChoices {
    pub subclass: Vec<AvailableChoice>,
    pub spell_school: Vec<AvailableChoice>,
    pub attribute_boost: Vec<AvailableChoice>,
    pub utility_spells: Vec<AvailableChoice>,
    pub pool_feature: Vec<AvailableChoice>,
}

impl AvailableChoices {
    pub fn of_kind(&self, kind: ChoiceKind) -> &[AvailableChoice] {
        match kind {
            ChoiceKind::Subclass => &self.subclass,
            ChoiceKind::SpellSchool => &self.spell_school,
            ChoiceKind::AttributeBoost => &self.attribute_boost,
            ChoiceKind::UtilitySpells => &self.utility_spells,
            ChoiceKind::PoolFeature => &self.pool_feature,
        }
    }

    pub fn find(&self, trait_id: &TraitId) -> Option<&AvailableChoice> {
        self.iter().find(|c| &c.trait_id == trait_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AvailableChoice> {
        self.subclass
            .iter()
            .chain(&self.spell_school)
            .chain(&self.attribute_boost)
            .chain(&self.utility_spells)
            .chain(&self.pool_feature)
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    fn push(&mut self, choice: AvailableChoice) {
        let list = match choice.kind {
            ChoiceKind::Subclass => &mut self.subclass,
            ChoiceKind::SpellSchool => &mut self.spell_school,
            ChoiceKind::AttributeBoost => &mut self.attribute_boost,
            ChoiceKind::UtilitySpells => &mut self.utility_spells,
            ChoiceKind::PoolFeature => &mut self.pool_feature,
        };
        list.push(choice);
    }
}

/// A value the player may pick for a choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub id: String,
    pub name: String,
    /// Set for utility spells
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
}

impl ChoiceOption {
    fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            school_id: None,
        }
    }
}

pub struct AvailabilityResolver {
    catalog: Arc<ContentCatalog>,
}

impl AvailabilityResolver {
    pub fn new(catalog: Arc<ContentCatalog>) -> Self {
        Self { catalog }
    }

    /// Reachable choices that still have picks remaining.
    pub fn available_choices(
        &self,
        character: &Character,
    ) -> Result<AvailableChoices, MissingRecord> {
        let mut grouped = AvailableChoices::default();
        for choice in self.choice_statuses(character)? {
            if choice.remaining > 0 {
                grouped.push(choice);
            }
        }
        Ok(grouped)
    }

    /// Status of every reachable, unlocked choice, resolved ones included.
    pub fn choice_statuses(
        &self,
        character: &Character,
    ) -> Result<Vec<AvailableChoice>, MissingRecord> {
        let reach = Reachability::resolve(&self.catalog, character)?;
        let mut statuses: Vec<AvailableChoice> = reach
            .choices()
            .map(|choice| status(&reach, choice))
            .filter(|status| status.state != ChoiceState::Locked)
            .collect();
        statuses.sort_by(|a, b| {
            let level = |c: &AvailableChoice| {
                self.catalog
                    .locate_trait(&c.trait_id)
                    .map(|l| l.feature_level)
            };
            level(a)
                .cmp(&level(b))
                .then_with(|| a.trait_id.cmp(&b.trait_id))
        });
        tracing::debug!(
            character_id = %character.id,
            choices = statuses.len(),
            "Resolved choice statuses"
        );
        Ok(statuses)
    }

    /// Lifecycle state of one trait; `Locked` for traits the character cannot reach.
    pub fn choice_state(
        &self,
        character: &Character,
        trait_id: &TraitId,
    ) -> Result<ChoiceState, MissingRecord> {
        let reach = Reachability::resolve(&self.catalog, character)?;
        Ok(reach
            .choice(trait_id)
            .map(|choice| status(&reach, choice).state)
            .unwrap_or(ChoiceState::Locked))
    }

    /// Values that could currently be picked for a reachable choice.
    ///
    /// Returns an empty list for unreachable traits.
    pub fn options(
        &self,
        character: &Character,
        trait_id: &TraitId,
    ) -> Result<Vec<ChoiceOption>, MissingRecord> {
        let reach = Reachability::resolve(&self.catalog, character)?;
        let Some(choice) = reach.choice(trait_id) else {
            return Ok(Vec::new());
        };
        let catalog = reach.catalog();

        let options = match choice.feature_trait {
            FeatureTrait::SubclassChoice(_) => catalog
                .subclasses_of(&character.class_id)
                .map(|s| ChoiceOption::new(s.id.as_str(), &s.name))
                .collect(),
            FeatureTrait::SpellSchoolChoice(school_choice) => catalog
                .schools()
                .filter(|s| school_choice.allows(&s.id))
                .map(|s| ChoiceOption::new(s.id.as_str(), &s.name))
                .collect(),
            FeatureTrait::AttributeBoost(boost) => Attribute::all()
                .into_iter()
                .filter(|a| boost.allowed_attributes.contains(a))
                .map(|a| ChoiceOption::new(a.as_str(), a.abbreviation()))
                .collect(),
            FeatureTrait::UtilitySpells(utility) => {
                let full_elsewhere: BTreeSet<_> = reach
                    .active_selections()
                    .filter(|s| s.granted_by() != trait_id)
                    .filter_map(|s| match s {
                        TraitSelection::UtilitySpells {
                            school_id,
                            spell_id: None,
                            ..
                        } => Some(school_id),
                        _ => None,
                    })
                    .collect();
                utility
                    .eligible_known(reach.known_schools())
                    .filter_map(|school_id| catalog.get_spell_school(school_id))
                    .flat_map(|school| match utility.selection {
                        UtilitySpellMode::FullSchool { .. } => {
                            if full_elsewhere.contains(&school.id) {
                                Vec::new()
                            } else {
                                vec![ChoiceOption::new(school.id.as_str(), &school.name)]
                            }
                        }
                        UtilitySpellMode::PerSchool { .. } | UtilitySpellMode::Count { .. } => {
                            school
                                .utility_spells()
                                .map(|spell| ChoiceOption {
                                    school_id: Some(school.id.to_string()),
                                    ..ChoiceOption::new(spell.id.as_str(), &spell.name)
                                })
                                .collect()
                        }
                    })
                    .collect()
            }
            FeatureTrait::PickFeatureFromPool(pick) => {
                let taken: BTreeSet<&FeatureId> = reach
                    .features()
                    .iter()
                    .filter(|f| f.picked_by.is_some_and(|t| t != trait_id))
                    .filter(|f| matches!(&f.origin, FeatureOrigin::Pool(p) if p == &pick.pool_id))
                    .map(|f| &f.feature.id)
                    .collect();
                catalog
                    .get_feature_pool(&pick.pool_id)
                    .map(|pool| {
                        pool.features
                            .iter()
                            .filter(|f| f.is_granted_at(character.level) && !taken.contains(&f.id))
                            .map(|f| ChoiceOption::new(f.id.as_str(), &f.name))
                            .collect()
                    })
                    .unwrap_or_default()
            }
            FeatureTrait::Ability { .. }
            | FeatureTrait::StatBonus { .. }
            | FeatureTrait::Proficiency { .. }
            | FeatureTrait::Resource { .. }
            | FeatureTrait::DicePool { .. }
            | FeatureTrait::SpellSchool { .. }
            | FeatureTrait::SpellTierAccess { .. }
            | FeatureTrait::Resistance { .. } => Vec::new(),
        };
        Ok(options)
    }
}

fn status(reach: &Reachability<'_>, choice: &ReachableTrait<'_>) -> AvailableChoice {
    let cardinality = reach.cardinality(choice);
    let selected = reach.active_for(choice.id).count() as u32;
    let selected = selected.min(cardinality);
    AvailableChoice {
        trait_id: choice.id.clone(),
        kind: choice.kind,
        feature_id: choice.feature.id.clone(),
        feature_name: choice.feature.name.clone(),
        origin: choice.origin.clone(),
        cardinality,
        selected,
        remaining: cardinality - selected,
        state: ChoiceState::from_counts(selected, cardinality),
        feature_trait: choice.feature_trait.clone(),
    }
}
