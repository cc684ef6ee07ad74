//! Derivation cache.
//!
//! Derived state is a pure function of the catalog and the character's
//! inputs, so a cached result stays valid for exactly as long as its input
//! fingerprint matches. Callers never need to invalidate on edit; a stale
//! entry simply misses.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};

use charforge_domain::{
    AncestryId, Attribute, BackgroundId, Character, CharacterId, ClassId, DerivedState, DicePoolId,
    ResourceId, SelectionStore,
};

/// SHA-256 over everything derivation reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputFingerprint([u8; 32]);

impl InputFingerprint {
    /// Fingerprint a character against a catalog version.
    ///
    /// Returns `None` if the inputs cannot be serialized; such characters
    /// are simply not cached.
    pub fn of(catalog_version: &str, character: &Character) -> Option<Self> {
        let inputs = DerivationInputs::from(character);
        let encoded = match serde_json::to_vec(&inputs) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(
                    character_id = %character.id,
                    error = %e,
                    "Cannot fingerprint character"
                );
                return None;
            }
        };

        let mut hasher = Sha256::new();
        hasher.update(b"catalog:");
        hasher.update(catalog_version.as_bytes());
        hasher.update(b"inputs:");
        hasher.update(&encoded);
        Some(Self(hasher.finalize().into()))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex chars, for logging.
    pub fn short_hex(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

/// The character fields derivation depends on. Name and edit time are left
/// out so renaming does not evict.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DerivationInputs<'a> {
    class_id: &'a ClassId,
    ancestry_id: &'a Option<AncestryId>,
    background_id: &'a Option<BackgroundId>,
    level: u8,
    attributes: &'a BTreeMap<Attribute, i32>,
    selections: &'a SelectionStore,
    resource_values: &'a BTreeMap<ResourceId, i32>,
    dice_values: &'a BTreeMap<DicePoolId, i32>,
}

impl<'a> From<&'a Character> for DerivationInputs<'a> {
    fn from(character: &'a Character) -> Self {
        Self {
            class_id: &character.class_id,
            ancestry_id: &character.ancestry_id,
            background_id: &character.background_id,
            level: character.level,
            attributes: &character.attributes,
            selections: &character.selections,
            resource_values: &character.resource_values,
            dice_values: &character.dice_values,
        }
    }
}

struct CacheEntry {
    fingerprint: InputFingerprint,
    state: Arc<DerivedState>,
}

/// Latest derived state per character, keyed by input fingerprint.
pub struct DerivationCache {
    entries: DashMap<CharacterId, CacheEntry>,
    capacity: usize,
}

impl DerivationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Cached state, if it was derived from exactly these inputs.
    pub fn get(
        &self,
        character_id: CharacterId,
        fingerprint: &InputFingerprint,
    ) -> Option<Arc<DerivedState>> {
        let entry = self.entries.get(&character_id)?;
        if entry.fingerprint == *fingerprint {
            Some(entry.state.clone())
        } else {
            None
        }
    }

    /// Store the latest state for a character, replacing any older one.
    ///
    /// Capacity is a soft bound: concurrent inserts can overshoot briefly,
    /// but every insert trims back down, evicting arbitrary other characters.
    pub fn insert(
        &self,
        character_id: CharacterId,
        fingerprint: InputFingerprint,
        state: Arc<DerivedState>,
    ) {
        self.entries.insert(character_id, CacheEntry { fingerprint, state });
        while self.entries.len() > self.capacity {
            // Copy the key out first; removing while a shard guard is held deadlocks.
            let victim = self
                .entries
                .iter()
                .map(|entry| *entry.key())
                .find(|id| *id != character_id);
            let Some(victim) = victim else {
                break;
            };
            if self.entries.remove(&victim).is_some() {
                tracing::debug!(character_id = %victim, "Evicted derived state");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
