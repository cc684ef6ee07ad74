//! Reachability - which features, choice points and selections are in effect
//! for a character right now.
//!
//! Shared by the availability resolver, selection validation and the effect
//! aggregator so they agree on a single answer. Stale or orphaned selections
//! are filtered here with a warning and never reach aggregation.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use charforge_domain::{
    AncestryId, BackgroundId, Character, ChoiceKind, ClassId, Feature, FeatureId, FeatureSource,
    FeatureTrait, SchoolId, SpellId, SubclassDefinition, TraitId, TraitSelection,
    UtilitySpellMode,
};

use crate::infrastructure::catalog::{ContentCatalog, FeatureOrigin};

/// A character references a record the catalog does not contain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MissingRecord {
    #[error("Unknown class: {0}")]
    Class(ClassId),
    #[error("Unknown ancestry: {0}")]
    Ancestry(AncestryId),
    #[error("Unknown background: {0}")]
    Background(BackgroundId),
}

/// A feature the character currently has.
#[derive(Debug, Clone)]
pub struct ReachableFeature<'a> {
    pub feature: &'a Feature,
    pub origin: FeatureOrigin,
    /// The pick trait that selected this feature, for pool features
    pub picked_by: Option<&'a TraitId>,
}

/// A choosable trait on a reachable feature.
#[derive(Debug, Clone)]
pub struct ReachableTrait<'a> {
    pub id: &'a TraitId,
    pub kind: ChoiceKind,
    pub feature_trait: &'a FeatureTrait,
    pub feature: &'a Feature,
    pub origin: FeatureOrigin,
}

pub struct Reachability<'a> {
    catalog: &'a ContentCatalog,
    character: &'a Character,
    features: Vec<ReachableFeature<'a>>,
    choices: BTreeMap<TraitId, ReachableTrait<'a>>,
    subclass: Option<&'a SubclassDefinition>,
    known_schools: BTreeSet<SchoolId>,
    /// (store position, selection), kept in store order
    active: Vec<(usize, &'a TraitSelection)>,
}

impl<'a> Reachability<'a> {
    /// Walk the catalog for this character.
    pub fn resolve(
        catalog: &'a ContentCatalog,
        character: &'a Character,
    ) -> Result<Self, MissingRecord> {
        let class = catalog
            .get_class_definition(&character.class_id)
            .ok_or_else(|| MissingRecord::Class(character.class_id.clone()))?;

        let mut reach = Reachability {
            catalog,
            character,
            features: Vec::new(),
            choices: BTreeMap::new(),
            subclass: None,
            known_schools: BTreeSet::new(),
            active: Vec::new(),
        };

        reach.add_source(class, FeatureOrigin::Class(class.id.clone()));
        if let Some(ancestry_id) = &character.ancestry_id {
            let ancestry = catalog
                .get_ancestry_definition(ancestry_id)
                .ok_or_else(|| MissingRecord::Ancestry(ancestry_id.clone()))?;
            reach.add_source(ancestry, FeatureOrigin::Ancestry(ancestry.id.clone()));
        }
        if let Some(background_id) = &character.background_id {
            let background = catalog
                .get_background_definition(background_id)
                .ok_or_else(|| MissingRecord::Background(background_id.clone()))?;
            reach.add_source(background, FeatureOrigin::Background(background.id.clone()));
        }

        reach.resolve_subclass();
        reach.resolve_pool_picks();
        reach.resolve_known_schools();
        reach.resolve_remaining_selections();
        reach.active.sort_by_key(|(position, _)| *position);
        Ok(reach)
    }

    pub fn catalog(&self) -> &'a ContentCatalog {
        self.catalog
    }

    pub fn character(&self) -> &'a Character {
        self.character
    }

    /// Reachable features, in discovery order.
    pub fn features(&self) -> &[ReachableFeature<'a>] {
        &self.features
    }

    pub fn choice(&self, trait_id: &TraitId) -> Option<&ReachableTrait<'a>> {
        self.choices.get(trait_id)
    }

    /// Reachable choice points ordered by trait id.
    pub fn choices(&self) -> impl Iterator<Item = &ReachableTrait<'a>> {
        self.choices.values()
    }

    pub fn subclass(&self) -> Option<&'a SubclassDefinition> {
        self.subclass
    }

    pub fn known_schools(&self) -> &BTreeSet<SchoolId> {
        &self.known_schools
    }

    /// Number of selections the choice accepts for this character.
    pub fn cardinality(&self, choice: &ReachableTrait<'_>) -> u32 {
        choice
            .feature_trait
            .cardinality(&self.known_schools)
            .unwrap_or(0)
    }

    /// Selections currently in effect, in store order.
    pub fn active_selections(&self) -> impl Iterator<Item = &'a TraitSelection> + '_ {
        self.active.iter().map(|(_, selection)| *selection)
    }

    pub fn active_for<'s>(
        &'s self,
        trait_id: &'s TraitId,
    ) -> impl Iterator<Item = &'a TraitSelection> + 's {
        self.active_selections()
            .filter(move |s| s.granted_by() == trait_id)
    }

    // -------------------------------------------------------------------------
    // Resolution stages
    // -------------------------------------------------------------------------

    fn add_source<S: FeatureSource>(&mut self, source: &'a S, origin: FeatureOrigin) {
        for feature in source.features_up_to(self.character.level) {
            self.add_feature(feature, origin.clone(), None);
        }
    }

    fn add_feature(
        &mut self,
        feature: &'a Feature,
        origin: FeatureOrigin,
        picked_by: Option<&'a TraitId>,
    ) {
        for feature_trait in &feature.traits {
            let (Some(id), Some(kind)) = (feature_trait.choice_id(), feature_trait.choice_kind())
            else {
                continue;
            };
            self.choices.entry(id.clone()).or_insert_with(|| ReachableTrait {
                id,
                kind,
                feature_trait,
                feature,
                origin: origin.clone(),
            });
        }
        self.features.push(ReachableFeature {
            feature,
            origin,
            picked_by,
        });
    }

    fn resolve_subclass(&mut self) {
        let character = self.character;
        for (position, selection) in character.selections.iter().enumerate() {
            let TraitSelection::Subclass { subclass_id, .. } = selection else {
                continue;
            };
            if !self.is_reachable_kind(selection) {
                continue;
            }
            if self.subclass.is_some() {
                self.ignore(selection, "a subclass is already chosen");
                continue;
            }
            match self.catalog.get_subclass_definition(subclass_id) {
                Some(subclass) if subclass.class_id == character.class_id => {
                    self.subclass = Some(subclass);
                    self.active.push((position, selection));
                }
                Some(_) => self.ignore(selection, "subclass belongs to another class"),
                None => self.ignore(selection, "subclass is not in the catalog"),
            }
        }

        if let Some(subclass) = self.subclass {
            self.add_source(subclass, FeatureOrigin::Subclass(subclass.id.clone()));
        }
    }

    fn resolve_pool_picks(&mut self) {
        let character = self.character;
        let mut picked: HashSet<(&'a str, &'a FeatureId)> = HashSet::new();
        let mut accepted: BTreeMap<&'a TraitId, u32> = BTreeMap::new();

        for (position, selection) in character.selections.iter().enumerate() {
            let TraitSelection::PoolFeature { feature, .. } = selection else {
                continue;
            };
            if !self.is_reachable_kind(selection) {
                continue;
            }
            let Some(choice) = self.choices.get(selection.granted_by()) else {
                continue;
            };
            let FeatureTrait::PickFeatureFromPool(pick) = choice.feature_trait else {
                continue;
            };
            let (trait_id, pool_id) = (choice.id, &pick.pool_id);

            let count = accepted.entry(trait_id).or_insert(0);
            if *count >= u32::from(pick.choices_allowed) {
                self.ignore(selection, "more picks than the trait allows");
                continue;
            }
            let Some(pool) = self.catalog.get_feature_pool(pool_id) else {
                self.ignore(selection, "pool is not in the catalog");
                continue;
            };
            if pool.feature(&feature.id).is_none() {
                self.ignore(selection, "feature is no longer in the pool");
                continue;
            }
            if feature.level > character.level {
                self.ignore(selection, "feature is above the character's level");
                continue;
            }
            if !picked.insert((pool_id.as_str(), &feature.id)) {
                self.ignore(selection, "feature already picked from this pool");
                continue;
            }

            *count += 1;
            self.active.push((position, selection));
            self.add_feature(feature, FeatureOrigin::Pool(pool_id.clone()), Some(trait_id));
        }
    }

    fn resolve_known_schools(&mut self) {
        let mut known = BTreeSet::new();
        for reachable in &self.features {
            for feature_trait in &reachable.feature.traits {
                if let FeatureTrait::SpellSchool { school_id } = feature_trait {
                    if self.catalog.get_spell_school(school_id).is_some() {
                        known.insert(school_id.clone());
                    } else {
                        tracing::warn!(
                            character_id = %self.character.id,
                            feature_id = %reachable.feature.id,
                            school_id = %school_id,
                            "Ignoring grant of unknown spell school"
                        );
                    }
                }
            }
        }

        let character = self.character;
        let mut accepted: BTreeMap<&'a TraitId, BTreeSet<&'a SchoolId>> = BTreeMap::new();
        for (position, selection) in character.selections.iter().enumerate() {
            let TraitSelection::SpellSchool { school_id, .. } = selection else {
                continue;
            };
            if !self.is_reachable_kind(selection) {
                continue;
            }
            let Some(choice) = self.choices.get(selection.granted_by()) else {
                continue;
            };
            let FeatureTrait::SpellSchoolChoice(school_choice) = choice.feature_trait else {
                continue;
            };
            let picks = accepted.entry(choice.id).or_default();

            if picks.len() >= usize::from(school_choice.number_of_choices) {
                self.ignore(selection, "more picks than the trait allows");
            } else if self.catalog.get_spell_school(school_id).is_none() {
                self.ignore(selection, "spell school is not in the catalog");
            } else if !school_choice.allows(school_id) {
                self.ignore(selection, "spell school is not allowed by the trait");
            } else if !picks.insert(school_id) {
                self.ignore(selection, "spell school picked twice");
            } else {
                known.insert(school_id.clone());
                self.active.push((position, selection));
            }
        }

        self.known_schools = known;
    }

    fn resolve_remaining_selections(&mut self) {
        let character = self.character;
        let mut counts: BTreeMap<&'a TraitId, u32> = BTreeMap::new();
        let mut per_school: BTreeMap<(&'a TraitId, &'a SchoolId), u32> = BTreeMap::new();

        for (position, selection) in character.selections.iter().enumerate() {
            if !self.is_reachable_kind(selection) {
                self.ignore_orphan(selection);
                continue;
            }
            let Some(choice) = self.choices.get(selection.granted_by()) else {
                continue;
            };
            let cardinality = self.cardinality(choice);

            match (selection, choice.feature_trait) {
                (
                    TraitSelection::AttributeBoost { attribute, amount, .. },
                    FeatureTrait::AttributeBoost(boost),
                ) => {
                    let count = counts.entry(choice.id).or_insert(0);
                    if *count >= cardinality {
                        self.ignore(selection, "more picks than the trait allows");
                    } else if !boost.allowed_attributes.contains(attribute) {
                        self.ignore(selection, "attribute is not allowed by the trait");
                    } else if *amount != boost.amount {
                        self.ignore(selection, "amount no longer matches the trait");
                    } else {
                        *count += 1;
                        self.active.push((position, selection));
                    }
                }
                (
                    TraitSelection::UtilitySpells {
                        school_id,
                        spell_id,
                        ..
                    },
                    FeatureTrait::UtilitySpells(utility),
                ) => {
                    let trait_id = choice.id;
                    let count = counts.get(trait_id).copied().unwrap_or(0);
                    let school_count =
                        per_school.get(&(trait_id, school_id)).copied().unwrap_or(0);
                    let eligible = utility
                        .eligible_known(&self.known_schools)
                        .any(|s| s == school_id);

                    let rejection = if count >= cardinality {
                        Some("more picks than the trait allows")
                    } else if !eligible {
                        Some("spell school is not known or not eligible")
                    } else {
                        self.utility_spell_rejection(
                            utility.selection,
                            school_id,
                            spell_id.as_ref(),
                            school_count,
                        )
                    };

                    match rejection {
                        Some(reason) => self.ignore(selection, reason),
                        None => {
                            counts.insert(trait_id, count + 1);
                            per_school.insert((trait_id, school_id), school_count + 1);
                            self.active.push((position, selection));
                        }
                    }
                }
                // Resolved by earlier stages
                (TraitSelection::Subclass { .. }, _)
                | (TraitSelection::SpellSchool { .. }, _)
                | (TraitSelection::PoolFeature { .. }, _) => {}
                (TraitSelection::AttributeBoost { .. }, _)
                | (TraitSelection::UtilitySpells { .. }, _) => {
                    self.ignore(selection, "selection kind does not match the trait")
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// The granting trait is reachable and of the selection's kind.
    fn utility_spell_rejection(
        &self,
        mode: UtilitySpellMode,
        school_id: &SchoolId,
        spell_id: Option<&SpellId>,
        school_count: u32,
    ) -> Option<&'static str> {
        let spell_id = match (mode, spell_id) {
            (UtilitySpellMode::FullSchool { .. }, None) => return None,
            (UtilitySpellMode::FullSchool { .. }, Some(_)) => {
                return Some("full-school grant names a single spell")
            }
            (_, None) => return Some("spell is missing"),
            (_, Some(spell_id)) => spell_id,
        };
        match self.catalog.get_spell(school_id, spell_id) {
            None => Some("spell is not in the catalog"),
            Some(spell) if !spell.utility => Some("spell is not a utility spell"),
            Some(_) => match mode {
                UtilitySpellMode::PerSchool { spells_per_school }
                    if school_count >= u32::from(spells_per_school) =>
                {
                    Some("too many spells from this school")
                }
                _ => None,
            },
        }
    }

    fn is_reachable_kind(&self, selection: &TraitSelection) -> bool {
        self.choices
            .get(selection.granted_by())
            .is_some_and(|choice| choice.kind == selection.kind())
    }

    fn ignore_orphan(&self, selection: &TraitSelection) {
        let reason = match self.choices.get(selection.granted_by()) {
            Some(_) => "selection kind does not match the trait",
            None => "granting trait is not reachable",
        };
        self.ignore(selection, reason);
    }

    fn ignore(&self, selection: &TraitSelection, reason: &str) {
        tracing::warn!(
            character_id = %self.character.id,
            trait_id = %selection.granted_by(),
            kind = %selection.kind(),
            reason,
            "Ignoring selection"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{catalog::sample_catalog, characters};
    use charforge_domain::{Attribute, Feature};

    #[test]
    fn class_features_are_level_gated() {
        let catalog = sample_catalog();
        let character = characters::berserker(2);
        let reach = Reachability::resolve(&catalog, &character).unwrap();

        let ids: Vec<_> = reach.features().iter().map(|f| f.feature.id.as_str()).collect();
        assert!(ids.contains(&"rage"));
        assert!(!ids.contains(&"berserker_path"));
        assert!(reach.choice(&"berserker_subclass".into()).is_none());
    }

    #[test]
    fn unknown_class_is_a_missing_record() {
        let catalog = sample_catalog();
        let mut character = characters::berserker(1);
        character.class_id = "paladin".into();
        let err = Reachability::resolve(&catalog, &character).err();
        assert_eq!(err, Some(MissingRecord::Class("paladin".into())));
    }

    #[test]
    fn subclass_features_follow_subclass_selection() {
        let catalog = sample_catalog();
        let mut character = characters::berserker(3);
        character
            .selections
            .record_single(
                &"berserker_subclass".into(),
                TraitSelection::subclass("berserker_subclass", "mountainheart"),
            )
            .unwrap();

        let reach = Reachability::resolve(&catalog, &character).unwrap();
        assert_eq!(reach.subclass().map(|s| s.id.as_str()), Some("mountainheart"));
        assert!(reach
            .features()
            .iter()
            .any(|f| f.feature.id.as_str() == "stone_skin"));
    }

    #[test]
    fn subclass_of_another_class_is_ignored() {
        let catalog = sample_catalog();
        let mut character = characters::berserker(3);
        character
            .selections
            .record_single(
                &"berserker_subclass".into(),
                TraitSelection::subclass("berserker_subclass", "flamecaller"),
            )
            .unwrap();

        let reach = Reachability::resolve(&catalog, &character).unwrap();
        assert!(reach.subclass().is_none());
        assert_eq!(reach.active_selections().count(), 0);
    }

    #[test]
    fn orphaned_selection_is_inactive_after_level_down() {
        let catalog = sample_catalog();
        let mut character = characters::berserker(4);
        character
            .selections
            .record_single(
                &"berserker_boost_4".into(),
                TraitSelection::attribute_boost("berserker_boost_4", Attribute::Strength, 1),
            )
            .unwrap();
        assert_eq!(
            Reachability::resolve(&catalog, &character)
                .unwrap()
                .active_selections()
                .count(),
            1
        );

        character.level = 3;
        let reach = Reachability::resolve(&catalog, &character).unwrap();
        assert_eq!(reach.active_selections().count(), 0);
        assert_eq!(character.selections.len(), 1);
    }

    #[test]
    fn pool_pick_adds_embedded_feature_with_origin() {
        let catalog = sample_catalog();
        let mut character = characters::berserker(5);
        let feint = catalog
            .get_feature_pool(&"combat_tricks".into())
            .and_then(|p| p.feature(&"feint".into()))
            .cloned()
            .unwrap();
        character
            .selections
            .replace_all(
                &"berserker_tricks_5".into(),
                vec![TraitSelection::pool_feature("berserker_tricks_5", feint)],
                1,
            )
            .unwrap();

        let reach = Reachability::resolve(&catalog, &character).unwrap();
        let picked = reach
            .features()
            .iter()
            .find(|f| f.feature.id.as_str() == "feint")
            .unwrap();
        assert_eq!(picked.origin, FeatureOrigin::Pool("combat_tricks".into()));
        assert_eq!(picked.picked_by.map(TraitId::as_str), Some("berserker_tricks_5"));
    }

    #[test]
    fn stale_pool_feature_is_ignored() {
        let catalog = sample_catalog();
        let mut character = characters::berserker(5);
        character
            .selections
            .replace_all(
                &"berserker_tricks_5".into(),
                vec![TraitSelection::pool_feature(
                    "berserker_tricks_5",
                    Feature::new("removed_trick", 1, "Removed Trick"),
                )],
                1,
            )
            .unwrap();

        let reach = Reachability::resolve(&catalog, &character).unwrap();
        assert!(!reach
            .features()
            .iter()
            .any(|f| f.feature.id.as_str() == "removed_trick"));
    }

    #[test]
    fn chosen_schools_become_known() {
        let catalog = sample_catalog();
        let mut character = characters::mage(1);
        character
            .selections
            .record_single(
                &"mage_school_1".into(),
                TraitSelection::spell_school("mage_school_1", "ice"),
            )
            .unwrap();

        let reach = Reachability::resolve(&catalog, &character).unwrap();
        assert!(reach.known_schools().contains(&SchoolId::from("ice")));
        let utility = reach.choice(&"mage_utility_1".into()).unwrap();
        assert_eq!(reach.cardinality(utility), 1);
    }

    #[test]
    fn stale_utility_spells_are_inactive() {
        let catalog = sample_catalog();
        let mut character = characters::mage(1);
        character
            .selections
            .record_single(
                &"mage_school_1".into(),
                TraitSelection::spell_school("mage_school_1", "fire"),
            )
            .unwrap();
        let trait_id = TraitId::from("mage_utility_1");

        let stale = [
            TraitSelection::utility_spell("mage_utility_1", "fire", "flame_dart"),
            TraitSelection::utility_spell("mage_utility_1", "fire", "unknown_spell"),
            TraitSelection::utility_school("mage_utility_1", "fire"),
        ];
        for selection in stale {
            character
                .selections
                .replace_all(&trait_id, vec![selection], 1)
                .unwrap();
            let reach = Reachability::resolve(&catalog, &character).unwrap();
            assert_eq!(reach.active_for(&trait_id).count(), 0);
        }

        character
            .selections
            .replace_all(
                &trait_id,
                vec![TraitSelection::utility_spell("mage_utility_1", "fire", "kindle")],
                1,
            )
            .unwrap();
        let reach = Reachability::resolve(&catalog, &character).unwrap();
        assert_eq!(reach.active_for(&trait_id).count(), 1);
    }
}
