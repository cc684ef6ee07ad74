//! Shared setup for E2E tests.

use std::sync::Arc;

use charforge_domain::{Character, DerivedState, TraitId, TraitSelection};

use crate::app::App;
use crate::infrastructure::{
    catalog::{CatalogBundle, ContentCatalog},
    clock::FixedClock,
    settings::EngineConfig,
};
use crate::test_fixtures::{catalog::sample_bundle, fixed_time};
use crate::use_cases::{AvailableChoice, ChoiceState};

/// A wired engine plus convenience wrappers over its use cases.
pub struct E2ETestContext {
    pub app: App,
}

impl E2ETestContext {
    /// Engine over the sample catalog.
    pub fn setup() -> Self {
        Self::with_bundle(sample_bundle())
    }

    /// Engine over a custom bundle; panics if the bundle is invalid.
    pub fn with_bundle(bundle: CatalogBundle) -> Self {
        let catalog = ContentCatalog::from_bundle(bundle)
            .unwrap_or_else(|e| panic!("E2E catalog is invalid: {}", e));
        let app = App::new(
            catalog,
            &EngineConfig::default(),
            Arc::new(FixedClock(fixed_time())),
        );
        Self { app }
    }

    pub fn derive(&self, character: &Character) -> Arc<DerivedState> {
        self.app
            .derive(character)
            .unwrap_or_else(|e| panic!("derivation failed: {}", e))
    }

    /// Status of a choice among the unlocked ones, if listed.
    pub fn status(&self, character: &Character, trait_id: &str) -> Option<AvailableChoice> {
        self.app
            .use_cases
            .availability
            .choice_statuses(character)
            .unwrap_or_else(|e| panic!("availability failed: {}", e))
            .into_iter()
            .find(|c| c.trait_id.as_str() == trait_id)
    }

    pub fn state(&self, character: &Character, trait_id: &str) -> ChoiceState {
        self.app
            .use_cases
            .availability
            .choice_state(character, &TraitId::from(trait_id))
            .unwrap_or_else(|e| panic!("availability failed: {}", e))
    }

    /// Record a single selection, panicking on rejection.
    pub fn choose(&self, character: &mut Character, selection: TraitSelection) {
        let trait_id = selection.granted_by().clone();
        self.app
            .use_cases
            .selections
            .record_single(character, &trait_id, selection)
            .unwrap_or_else(|e| panic!("selection for '{}' rejected: {}", trait_id, e));
    }

    /// Replace a multi-pick choice, panicking on rejection.
    pub fn choose_all(
        &self,
        character: &mut Character,
        trait_id: &str,
        selections: Vec<TraitSelection>,
    ) {
        self.app
            .use_cases
            .selections
            .replace_all(character, &TraitId::from(trait_id), selections)
            .unwrap_or_else(|e| panic!("selections for '{}' rejected: {}", trait_id, e));
    }

    /// A pool feature selection carrying the catalog copy of the feature.
    pub fn pool_pick(&self, trait_id: &str, pool_id: &str, feature_id: &str) -> TraitSelection {
        let feature = self
            .app
            .catalog
            .get_feature_pool(&pool_id.into())
            .and_then(|p| p.feature(&feature_id.into()))
            .cloned()
            .unwrap_or_else(|| panic!("pool '{}' has no feature '{}'", pool_id, feature_id));
        TraitSelection::pool_feature(trait_id, feature)
    }
}
