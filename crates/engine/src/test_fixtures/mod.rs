//! Test fixtures loader for JSON fixture files and common test helpers.
//!
//! Fixtures live in the `test_data/` directory next to this crate's
//! `Cargo.toml`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_fixtures::{catalog::sample_catalog, characters};
//!
//! #[test]
//! fn berserker_has_rage() {
//!     let catalog = sample_catalog();
//!     let character = characters::berserker(1);
//!     // ... test logic
//! }
//! ```

use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};

// =============================================================================
// Fixture Loading
// =============================================================================

/// Load a JSON fixture from test_data/ directory.
///
/// # Panics
///
/// Panics if the fixture file cannot be read or parsed.
pub fn load_fixture<T: serde::de::DeserializeOwned>(path: &str) -> T {
    let fixture_path = fixture_path(path);
    let content = std::fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read fixture '{}': {}",
            fixture_path.display(),
            e
        )
    });
    serde_json::from_str(&content).unwrap_or_else(|e| {
        panic!(
            "Failed to parse fixture '{}': {}",
            fixture_path.display(),
            e
        )
    })
}

/// Absolute path of a file under test_data/.
pub fn fixture_path(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join(path)
}

/// The instant every fixture character was last edited.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("fixture timestamp is ambiguous"))
}

// =============================================================================
// Catalog Fixtures
// =============================================================================

/// The small two-class catalog most tests run against.
///
/// - Berserker: fury resource and dice, subclass at 3, boost at 4,
///   combat trick picks at 5 and 9, fury override at 7
/// - Mage: school choice, tier access, mana (overridden at 5), utility
///   spells per school, full-school mastery at 6 and 8
/// - Schools: fire, ice, wind, radiant
pub mod catalog {
    use super::load_fixture;
    use crate::infrastructure::catalog::{CatalogBundle, ContentCatalog};

    pub fn sample_bundle() -> CatalogBundle {
        load_fixture("catalog/sample.json")
    }

    pub fn sample_catalog() -> ContentCatalog {
        ContentCatalog::from_bundle(sample_bundle())
            .unwrap_or_else(|e| panic!("sample catalog is invalid: {}", e))
    }
}

// =============================================================================
// Character Fixtures
// =============================================================================

/// Pre-built characters with no selections.
pub mod characters {
    use super::fixed_time;
    use charforge_domain::{Attribute, Character, CharacterName};

    fn named(name: &str, class_id: &str) -> Character {
        let name = CharacterName::new(name).unwrap_or_else(|e| panic!("{}", e));
        Character::new(name, class_id, fixed_time())
    }

    /// Brakka the berserker: STR 3, DEX 2, INT 0, WIL 1.
    pub fn berserker(level: u8) -> Character {
        named("Brakka", "berserker")
            .with_attribute(Attribute::Strength, 3)
            .with_attribute(Attribute::Dexterity, 2)
            .with_attribute(Attribute::Intelligence, 0)
            .with_attribute(Attribute::Will, 1)
            .at_level(level)
    }

    /// Ilsa the mage: STR 0, DEX 1, INT 3, WIL 2.
    pub fn mage(level: u8) -> Character {
        named("Ilsa", "mage")
            .with_attribute(Attribute::Strength, 0)
            .with_attribute(Attribute::Dexterity, 1)
            .with_attribute(Attribute::Intelligence, 3)
            .with_attribute(Attribute::Will, 2)
            .at_level(level)
    }
}
