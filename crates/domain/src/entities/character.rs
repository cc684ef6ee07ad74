//! Character entity - the player-owned inputs to derivation.
//!
//! A character references catalog records by id and exclusively owns its
//! selections. The subclass is not stored on its own; it is read from the
//! `subclass` selection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::selection::SelectionStore;
use crate::error::DomainError;
use crate::ids::{AncestryId, BackgroundId, CharacterId, ClassId, DicePoolId, ResourceId};
use crate::value_objects::{Attribute, CharacterName, FormulaContext};

/// Highest supported character level
pub const MAX_LEVEL: u8 = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: CharacterId,
    pub name: CharacterName,
    pub class_id: ClassId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ancestry_id: Option<AncestryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_id: Option<BackgroundId>,
    pub level: u8,
    /// Base attribute scores; missing attributes count as 0
    #[serde(default)]
    pub attributes: BTreeMap<Attribute, i32>,
    #[serde(default)]
    pub selections: SelectionStore,
    /// Live values of tracked resources, keyed by resource id
    #[serde(default)]
    pub resource_values: BTreeMap<ResourceId, i32>,
    /// Live remaining dice, keyed by dice pool id
    #[serde(default)]
    pub dice_values: BTreeMap<DicePoolId, i32>,
    pub updated_at: DateTime<Utc>,
}

impl Character {
    pub fn new(name: CharacterName, class_id: impl Into<ClassId>, now: DateTime<Utc>) -> Self {
        Self {
            id: CharacterId::new(),
            name,
            class_id: class_id.into(),
            ancestry_id: None,
            background_id: None,
            level: 1,
            attributes: BTreeMap::new(),
            selections: SelectionStore::new(),
            resource_values: BTreeMap::new(),
            dice_values: BTreeMap::new(),
            updated_at: now,
        }
    }

    pub fn with_ancestry(mut self, ancestry_id: impl Into<AncestryId>) -> Self {
        self.ancestry_id = Some(ancestry_id.into());
        self
    }

    pub fn with_background(mut self, background_id: impl Into<BackgroundId>) -> Self {
        self.background_id = Some(background_id.into());
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute, value: i32) -> Self {
        self.attributes.insert(attribute, value);
        self
    }

    /// Builder form of [`Character::set_level`]; invalid levels are clamped.
    pub fn at_level(mut self, level: u8) -> Self {
        self.level = level.clamp(1, MAX_LEVEL);
        self
    }

    /// Change level. Selections are retained even if their traits become
    /// unreachable.
    pub fn set_level(&mut self, level: u8, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !(1..=MAX_LEVEL).contains(&level) {
            return Err(DomainError::validation(format!(
                "Character level must be between 1 and {}, got {}",
                MAX_LEVEL, level
            )));
        }
        self.level = level;
        self.touch(now);
        Ok(())
    }

    pub fn base_attribute(&self, attribute: Attribute) -> i32 {
        self.attributes.get(&attribute).copied().unwrap_or(0)
    }

    /// Record the live value of a resource.
    pub fn set_current_value(
        &mut self,
        resource_id: impl Into<ResourceId>,
        value: i32,
        now: DateTime<Utc>,
    ) {
        self.resource_values.insert(resource_id.into(), value);
        self.touch(now);
    }

    /// Record the remaining dice of a dice pool.
    pub fn set_dice_remaining(
        &mut self,
        pool_id: impl Into<DicePoolId>,
        value: i32,
        now: DateTime<Utc>,
    ) {
        self.dice_values.insert(pool_id.into(), value);
        self.touch(now);
    }

    /// Formula inputs from base scores only.
    pub fn base_formula_context(&self) -> FormulaContext {
        FormulaContext::new(self.level, self.attributes.clone())
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
