//! Character display names.
//!
//! Trimmed, non-empty and at most [`MAX_CHARACTER_NAME_CHARS`] characters,
//! checked both at construction and on deserialization.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

pub const MAX_CHARACTER_NAME_CHARS: usize = 200;

/// Display name of a character
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CharacterName(String);

impl CharacterName {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value: String = value.into();
        let value = value.trim();
        if value.is_empty() {
            return Err(DomainError::validation("Character name cannot be empty"));
        }
        let chars = value.chars().count();
        if chars > MAX_CHARACTER_NAME_CHARS {
            return Err(DomainError::validation(format!(
                "Character name cannot exceed {} characters, got {}",
                MAX_CHARACTER_NAME_CHARS, chars
            )));
        }
        Ok(Self(value.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CharacterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CharacterName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CharacterName> for String {
    fn from(value: CharacterName) -> String {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_name_is_trimmed_but_keeps_case() {
        let name = CharacterName::new("  Oskar the Bold  ").unwrap();
        assert_eq!(name.as_str(), "Oskar the Bold");
        assert_eq!(name.to_string(), "Oskar the Bold");
    }

    #[test]
    fn blank_names_are_rejected() {
        let err = CharacterName::new("   ").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(err.to_string().contains("Character name cannot be empty"));
    }

    #[test]
    fn length_limit_counts_characters() {
        assert!(CharacterName::new("ä".repeat(MAX_CHARACTER_NAME_CHARS)).is_ok());
        let err = CharacterName::new("a".repeat(201)).unwrap_err();
        assert!(err.to_string().contains("got 201"));
    }

    #[test]
    fn invalid_names_fail_deserialization() {
        assert!(serde_json::from_str::<CharacterName>("\"\"").is_err());
        let name: CharacterName = serde_json::from_str("\" Brakka \"").unwrap();
        assert_eq!(name.as_str(), "Brakka");
    }
}
