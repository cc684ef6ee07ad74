//! StatKey - the target of a stat bonus.
//!
//! Bonuses land on an attribute, a skill, or a combat stat. Keys serialize as
//! `"<kind>:<name>"` strings so derived totals can be stored in ordinary JSON
//! maps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Attribute;
use crate::error::DomainError;

/// Combat statistics that can receive bonuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatStat {
    Armor,
    MaxHitPoints,
    Initiative,
    Speed,
    MaxWounds,
    HitDice,
}

impl CombatStat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Armor => "armor",
            Self::MaxHitPoints => "max_hit_points",
            Self::Initiative => "initiative",
            Self::Speed => "speed",
            Self::MaxWounds => "max_wounds",
            Self::HitDice => "hit_dice",
        }
    }
}

impl FromStr for CombatStat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "armor" => Ok(Self::Armor),
            "max_hit_points" | "hit_points" | "hp" => Ok(Self::MaxHitPoints),
            "initiative" => Ok(Self::Initiative),
            "speed" => Ok(Self::Speed),
            "max_wounds" | "wounds" => Ok(Self::MaxWounds),
            "hit_dice" => Ok(Self::HitDice),
            _ => Err(DomainError::parse(format!("Unknown combat stat: {}", s))),
        }
    }
}

/// What a stat bonus applies to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StatKey {
    Attribute(Attribute),
    /// Skills are catalog-defined, so they stay open strings (lowercased).
    Skill(String),
    Combat(CombatStat),
}

impl StatKey {
    pub fn attribute(attribute: Attribute) -> Self {
        Self::Attribute(attribute)
    }

    pub fn skill(name: impl Into<String>) -> Self {
        Self::Skill(name.into().trim().to_lowercase())
    }

    pub fn combat(stat: CombatStat) -> Self {
        Self::Combat(stat)
    }

    /// The attribute this key targets, if any.
    pub fn as_attribute(&self) -> Option<Attribute> {
        match self {
            Self::Attribute(attribute) => Some(*attribute),
            Self::Skill(_) | Self::Combat(_) => None,
        }
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attribute(attribute) => write!(f, "attribute:{}", attribute.as_str()),
            Self::Skill(name) => write!(f, "skill:{}", name),
            Self::Combat(stat) => write!(f, "combat:{}", stat.as_str()),
        }
    }
}

impl FromStr for StatKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once(':')
            .ok_or_else(|| DomainError::parse(format!("Stat key missing ':' separator: {}", s)))?;
        if name.trim().is_empty() {
            return Err(DomainError::parse(format!("Stat key has empty name: {}", s)));
        }
        match kind.trim() {
            "attribute" => Ok(Self::Attribute(name.parse()?)),
            "skill" => Ok(Self::skill(name)),
            "combat" => Ok(Self::Combat(name.parse()?)),
            other => Err(DomainError::parse(format!("Unknown stat kind: {}", other))),
        }
    }
}

impl TryFrom<String> for StatKey {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<StatKey> for String {
    fn from(key: StatKey) -> String {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_kind() {
        assert_eq!(
            "attribute:STR".parse::<StatKey>().unwrap(),
            StatKey::Attribute(Attribute::Strength)
        );
        assert_eq!(
            "skill:Stealth".parse::<StatKey>().unwrap(),
            StatKey::Skill("stealth".into())
        );
        assert_eq!(
            "combat:armor".parse::<StatKey>().unwrap(),
            StatKey::Combat(CombatStat::Armor)
        );
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!("strength".parse::<StatKey>().is_err());
        assert!("skill:".parse::<StatKey>().is_err());
        assert!("mood:grumpy".parse::<StatKey>().is_err());
        assert!("attribute:luck".parse::<StatKey>().is_err());
    }

    #[test]
    fn serializes_as_map_key() {
        let mut totals = std::collections::BTreeMap::new();
        totals.insert(StatKey::combat(CombatStat::Speed), 1);
        totals.insert(StatKey::attribute(Attribute::Will), 2);

        let json = serde_json::to_string(&totals).unwrap();
        assert_eq!(json, r#"{"attribute:will":2,"combat:speed":1}"#);

        let parsed: std::collections::BTreeMap<StatKey, i32> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, totals);
    }
}
