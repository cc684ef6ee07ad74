//! Feature entity - a named, leveled bundle of traits.
//!
//! Features are granted by a class, subclass, ancestry or background as the
//! character levels up, or picked from a feature pool.

use serde::{Deserialize, Serialize};

use super::feature_trait::FeatureTrait;
use crate::ids::{FeatureId, TraitId};

/// A feature a character gains at a given level.
///
/// # Simple Data Struct
///
/// This is catalog data with no invariants to protect beyond those checked
/// when the catalog is loaded, so all fields are public.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    /// Unique identifier for this feature
    pub id: FeatureId,
    /// Level at which this feature is gained (>= 1)
    pub level: u8,
    /// Display name of the feature
    pub name: String,
    /// Full description of what the feature does
    #[serde(default)]
    pub description: String,
    /// Effects and choice points, in declaration order
    #[serde(default)]
    pub traits: Vec<FeatureTrait>,
}

impl Feature {
    /// Create a new feature with no traits.
    pub fn new(id: impl Into<FeatureId>, level: u8, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            level,
            name: name.into(),
            description: String::new(),
            traits: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a trait.
    pub fn with_trait(mut self, feature_trait: FeatureTrait) -> Self {
        self.traits.push(feature_trait);
        self
    }

    /// A feature without traits is purely descriptive.
    pub fn is_passive_flavor(&self) -> bool {
        self.traits.is_empty()
    }

    /// Whether the feature is granted at or below the given level.
    pub fn is_granted_at(&self, level: u8) -> bool {
        self.level <= level
    }

    /// Choosable traits declared directly on this feature.
    pub fn choice_traits(&self) -> impl Iterator<Item = &FeatureTrait> {
        self.traits.iter().filter(|t| t.is_choosable())
    }

    /// Find a trait on this feature by its choice id.
    pub fn find_trait(&self, trait_id: &TraitId) -> Option<&FeatureTrait> {
        self.traits
            .iter()
            .find(|t| t.choice_id() == Some(trait_id))
    }
}
