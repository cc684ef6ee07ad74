//! Trait selections - a player's resolved choices, and the store that owns them.
//!
//! Every selection carries `granted_by_trait_id`, the id of the choosable
//! trait it resolves. All lookups, replacement and cardinality checks key off
//! that id and nothing else; the store never relies on position.

use serde::{Deserialize, Serialize};

use super::feature::Feature;
use super::feature_trait::ChoiceKind;
use crate::error::DomainError;
use crate::ids::{SchoolId, SpellId, SubclassId, TraitId};
use crate::value_objects::Attribute;

/// A stored resolution of one choosable trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum TraitSelection {
    Subclass {
        granted_by_trait_id: TraitId,
        subclass_id: SubclassId,
    },
    SpellSchool {
        granted_by_trait_id: TraitId,
        school_id: SchoolId,
    },
    AttributeBoost {
        granted_by_trait_id: TraitId,
        attribute: Attribute,
        amount: i32,
    },
    /// A single utility spell, or a whole school when `spell_id` is absent
    /// (full-school mode).
    UtilitySpells {
        granted_by_trait_id: TraitId,
        school_id: SchoolId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        spell_id: Option<SpellId>,
    },
    PoolFeature {
        granted_by_trait_id: TraitId,
        feature: Feature,
    },
}

impl TraitSelection {
    pub fn subclass(trait_id: impl Into<TraitId>, subclass_id: impl Into<SubclassId>) -> Self {
        Self::Subclass {
            granted_by_trait_id: trait_id.into(),
            subclass_id: subclass_id.into(),
        }
    }

    pub fn spell_school(trait_id: impl Into<TraitId>, school_id: impl Into<SchoolId>) -> Self {
        Self::SpellSchool {
            granted_by_trait_id: trait_id.into(),
            school_id: school_id.into(),
        }
    }

    pub fn attribute_boost(
        trait_id: impl Into<TraitId>,
        attribute: Attribute,
        amount: i32,
    ) -> Self {
        Self::AttributeBoost {
            granted_by_trait_id: trait_id.into(),
            attribute,
            amount,
        }
    }

    pub fn utility_spell(
        trait_id: impl Into<TraitId>,
        school_id: impl Into<SchoolId>,
        spell_id: impl Into<SpellId>,
    ) -> Self {
        Self::UtilitySpells {
            granted_by_trait_id: trait_id.into(),
            school_id: school_id.into(),
            spell_id: Some(spell_id.into()),
        }
    }

    pub fn utility_school(trait_id: impl Into<TraitId>, school_id: impl Into<SchoolId>) -> Self {
        Self::UtilitySpells {
            granted_by_trait_id: trait_id.into(),
            school_id: school_id.into(),
            spell_id: None,
        }
    }

    pub fn pool_feature(trait_id: impl Into<TraitId>, feature: Feature) -> Self {
        Self::PoolFeature {
            granted_by_trait_id: trait_id.into(),
            feature,
        }
    }

    /// The id of the trait this selection resolves.
    pub fn granted_by(&self) -> &TraitId {
        match self {
            TraitSelection::Subclass { granted_by_trait_id, .. }
            | TraitSelection::SpellSchool { granted_by_trait_id, .. }
            | TraitSelection::AttributeBoost { granted_by_trait_id, .. }
            | TraitSelection::UtilitySpells { granted_by_trait_id, .. }
            | TraitSelection::PoolFeature { granted_by_trait_id, .. } => granted_by_trait_id,
        }
    }

    pub fn kind(&self) -> ChoiceKind {
        match self {
            TraitSelection::Subclass { .. } => ChoiceKind::Subclass,
            TraitSelection::SpellSchool { .. } => ChoiceKind::SpellSchool,
            TraitSelection::AttributeBoost { .. } => ChoiceKind::AttributeBoost,
            TraitSelection::UtilitySpells { .. } => ChoiceKind::UtilitySpells,
            TraitSelection::PoolFeature { .. } => ChoiceKind::PoolFeature,
        }
    }
}

/// The character's selections.
///
/// Mutations are all-or-nothing: a rejected call leaves the store exactly as
/// it was. Catalog-aware validation (allowed attributes, known schools and so
/// on) happens before these methods are called; the store itself enforces the
/// correlation key and cardinality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionStore {
    selections: Vec<TraitSelection>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever is stored for `trait_id` with exactly one selection.
    pub fn record_single(
        &mut self,
        trait_id: &TraitId,
        selection: TraitSelection,
    ) -> Result<(), DomainError> {
        Self::check_key(trait_id, &selection)?;
        self.remove(trait_id);
        self.selections.push(selection);
        Ok(())
    }

    /// Replace every selection for `trait_id`.
    ///
    /// Fails without touching the store when `selections` exceeds
    /// `cardinality` or contains a selection keyed to another trait.
    pub fn replace_all(
        &mut self,
        trait_id: &TraitId,
        selections: Vec<TraitSelection>,
        cardinality: u32,
    ) -> Result<(), DomainError> {
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
            Self::check_key(trait_id, selection)?;
        }
        self.remove(trait_id);
        self.selections.extend(selections);
        Ok(())
    }

    /// Clear all selections for `trait_id`. Returns how many were removed.
    pub fn remove(&mut self, trait_id: &TraitId) -> usize {
        let before = self.selections.len();
        self.selections.retain(|s| s.granted_by() != trait_id);
        before - self.selections.len()
    }

    /// Keep only the selections the predicate accepts. Returns how many were dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&TraitSelection) -> bool) -> usize {
        let before = self.selections.len();
        self.selections.retain(|s| keep(s));
        before - self.selections.len()
    }

    pub fn for_trait<'a>(
        &'a self,
        trait_id: &'a TraitId,
    ) -> impl Iterator<Item = &'a TraitSelection> + 'a {
        self.selections
            .iter()
            .filter(move |s| s.granted_by() == trait_id)
    }

    pub fn count_for(&self, trait_id: &TraitId) -> usize {
        self.for_trait(trait_id).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TraitSelection> {
        self.selections.iter()
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    fn check_key(trait_id: &TraitId, selection: &TraitSelection) -> Result<(), DomainError> {
        if selection.granted_by() != trait_id {
            return Err(DomainError::selection_invalid(
                trait_id,
                format!("selection is keyed to trait '{}'", selection.granted_by()),
            ));
        }
        Ok(())
    }
}

impl From<Vec<TraitSelection>> for SelectionStore {
    fn from(selections: Vec<TraitSelection>) -> Self {
        Self { selections }
    }
}

impl<'a> IntoIterator for &'a SelectionStore {
    type Item = &'a TraitSelection;
    type IntoIter = std::slice::Iter<'a, TraitSelection>;

    fn into_iter(self) -> Self::IntoIter {
        self.selections.iter()
    }
}
