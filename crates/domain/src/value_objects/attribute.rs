//! Attribute value object - the four core character attributes.
//!
//! Provides type safety for attribute references in stat bonuses, attribute
//! boosts and formulas instead of magic strings like "STR" or "will".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Core character attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    /// Strength - physical power
    Strength,
    /// Dexterity - agility and reflexes
    Dexterity,
    /// Intelligence - reasoning and arcane aptitude
    Intelligence,
    /// Will - resolve and force of personality
    Will,
}

impl Attribute {
    /// Returns the lowercase key used in catalogs and formulas (e.g., "strength").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strength => "strength",
            Self::Dexterity => "dexterity",
            Self::Intelligence => "intelligence",
            Self::Will => "will",
        }
    }

    /// Returns the short uppercase abbreviation (e.g., "STR", "WIL").
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Self::Strength => "STR",
            Self::Dexterity => "DEX",
            Self::Intelligence => "INT",
            Self::Will => "WIL",
        }
    }

    /// Returns all attributes in sheet order.
    pub fn all() -> [Attribute; 4] {
        [
            Self::Strength,
            Self::Dexterity,
            Self::Intelligence,
            Self::Will,
        ]
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "STR" | "STRENGTH" => Ok(Self::Strength),
            "DEX" | "DEXTERITY" => Ok(Self::Dexterity),
            "INT" | "INTELLIGENCE" => Ok(Self::Intelligence),
            "WIL" | "WILL" => Ok(Self::Will),
            _ => Err(DomainError::parse(format!("Unknown attribute: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_from_str() {
        assert_eq!(Attribute::from_str("STR").unwrap(), Attribute::Strength);
        assert_eq!(Attribute::from_str("strength").unwrap(), Attribute::Strength);
        assert_eq!(Attribute::from_str("Dex").unwrap(), Attribute::Dexterity);
        assert_eq!(Attribute::from_str("wil").unwrap(), Attribute::Will);
        assert!(Attribute::from_str("charisma").is_err());
    }

    #[test]
    fn test_attribute_display() {
        assert_eq!(Attribute::Intelligence.to_string(), "intelligence");
        assert_eq!(Attribute::Intelligence.abbreviation(), "INT");
    }

    #[test]
    fn test_attribute_serde_roundtrip() {
        let json = serde_json::to_string(&Attribute::Will).unwrap();
        assert_eq!(json, "\"will\"");
        let parsed: Attribute = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Attribute::Will);
    }
}
