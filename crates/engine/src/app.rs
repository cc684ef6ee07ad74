//! Application state and composition.

use std::sync::Arc;

use charforge_domain::{Character, DerivedState};

use crate::infrastructure::{
    cache::{DerivationCache, InputFingerprint},
    catalog::{CatalogError, ContentCatalog},
    clock::SharedClock,
    ports::CatalogSource,
    settings::EngineConfig,
};
use crate::use_cases;
use crate::use_cases::AggregationError;

/// Main application state.
///
/// Owns the catalog for the life of the process; every use case shares it.
pub struct App {
    pub catalog: Arc<ContentCatalog>,
    pub use_cases: UseCases,
    cache: Option<DerivationCache>,
}

/// Container for all use cases.
pub struct UseCases {
    pub selections: use_cases::SelectionUseCases,
    pub availability: use_cases::AvailabilityResolver,
    pub aggregation: use_cases::EffectAggregator,
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(catalog: ContentCatalog, config: &EngineConfig, clock: SharedClock) -> Self {
        let catalog = Arc::new(catalog);

        let use_cases = UseCases {
            selections: use_cases::SelectionUseCases::new(catalog.clone(), clock),
            availability: use_cases::AvailabilityResolver::new(catalog.clone()),
            aggregation: use_cases::EffectAggregator::new(catalog.clone()),
        };

        let cache = config
            .derivation_cache
            .then(|| DerivationCache::new(config.cache_capacity));

        Self {
            catalog,
            use_cases,
            cache,
        }
    }

    /// Load and validate the catalog from a source, then wire the app.
    pub async fn load(
        config: &EngineConfig,
        source: &dyn CatalogSource,
        clock: SharedClock,
    ) -> Result<Self, CatalogError> {
        tracing::info!(source = %source.describe(), "Loading content catalog");
        let bundle = source.load().await?;
        let catalog = ContentCatalog::from_bundle(bundle)?;

        let summary = catalog.summary();
        tracing::info!(
            version = %catalog.version(),
            classes = summary.classes,
            subclasses = summary.subclasses,
            ancestries = summary.ancestries,
            backgrounds = summary.backgrounds,
            pools = summary.pools,
            schools = summary.schools,
            choice_traits = summary.choice_traits,
            "Content catalog loaded"
        );

        Ok(Self::new(catalog, config, clock))
    }

    /// Derived state for a character, served from the cache when the
    /// character's inputs have not changed since the last derivation.
    pub fn derive(&self, character: &Character) -> Result<Arc<DerivedState>, AggregationError> {
        let Some(cache) = &self.cache else {
            return self.use_cases.aggregation.derive(character).map(Arc::new);
        };

        let fingerprint = InputFingerprint::of(self.catalog.version(), character);
        if let Some(fingerprint) = &fingerprint {
            if let Some(state) = cache.get(character.id, fingerprint) {
                tracing::trace!(
                    character_id = %character.id,
                    fingerprint = %fingerprint.short_hex(),
                    "Derivation cache hit"
                );
                return Ok(state);
            }
        }

        let state = Arc::new(self.use_cases.aggregation.derive(character)?);
        if let Some(fingerprint) = fingerprint {
            cache.insert(character.id, fingerprint, state.clone());
        }
        Ok(state)
    }

    pub fn cache(&self) -> Option<&DerivationCache> {
        self.cache.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::content_sources::JsonCatalogSource;
    use crate::infrastructure::ports::{CatalogSourceError, MockCatalogSource};
    use crate::test_fixtures::{catalog::sample_bundle, characters, fixed_time};
    use charforge_domain::{Attribute, TraitSelection};

    fn clock() -> SharedClock {
        Arc::new(FixedClock(fixed_time()))
    }

    #[tokio::test]
    async fn load_validates_catalog_from_source() {
        let mut source = MockCatalogSource::new();
        source.expect_describe().return_const("mock".to_string());
        source.expect_load().times(1).returning(|| Ok(sample_bundle()));

        let app = App::load(&EngineConfig::default(), &source, clock())
            .await
            .unwrap();
        assert_eq!(app.catalog.version(), "test-1");
        assert!(app.cache().is_some());
    }

    #[tokio::test]
    async fn load_surfaces_source_errors() {
        let mut source = MockCatalogSource::new();
        source.expect_describe().return_const("mock".to_string());
        source
            .expect_load()
            .returning(|| Err(CatalogSourceError::NotFound("missing.json".into())));

        let err = App::load(&EngineConfig::default(), &source, clock())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CatalogError::Source(ref e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn invalid_bundle_is_rejected() {
        let mut bundle = sample_bundle();
        let duplicate = bundle.classes[0].clone();
        bundle.classes.push(duplicate);

        let mut source = MockCatalogSource::new();
        source.expect_describe().return_const("mock".to_string());
        source.expect_load().return_once(move || Ok(bundle));

        let result = App::load(&EngineConfig::default(), &source, clock()).await;
        assert!(matches!(result, Err(CatalogError::DuplicateId { .. })));
    }

    #[tokio::test]
    async fn shipped_sample_catalog_loads() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../content/catalog.json");
        let config = EngineConfig::default().with_catalog_path(&path);
        let source = JsonCatalogSource::new(&config.catalog_path);

        let app = App::load(&config, &source, clock()).await.unwrap();
        assert_eq!(app.catalog.version(), "sample-1");
        let state = app.derive(&characters::berserker(1)).unwrap();
        assert!(state.has_ability("rage"));
    }

    #[test]
    fn derive_reuses_cached_state_until_inputs_change() {
        let catalog = ContentCatalog::from_bundle(sample_bundle()).unwrap();
        let app = App::new(catalog, &EngineConfig::default(), clock());

        let mut character = characters::berserker(4);
        let first = app.derive(&character).unwrap();
        let second = app.derive(&character).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        app.use_cases
            .selections
            .record_single(
                &mut character,
                &"berserker_boost_4".into(),
                TraitSelection::attribute_boost("berserker_boost_4", Attribute::Strength, 1),
            )
            .unwrap();
        let third = app.derive(&character).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.attribute(Attribute::Strength), 4);
        assert_eq!(app.cache().map(|c| c.len()), Some(1));
    }

    #[test]
    fn derive_without_cache_matches_cached() {
        let catalog = ContentCatalog::from_bundle(sample_bundle()).unwrap();
        let uncached = App::new(catalog.clone(), &EngineConfig::default().without_cache(), clock());
        let cached = App::new(catalog, &EngineConfig::default(), clock());
        assert!(uncached.cache().is_none());

        let character = characters::mage(5);
        assert_eq!(
            *uncached.derive(&character).unwrap(),
            *cached.derive(&character).unwrap()
        );
    }
}
