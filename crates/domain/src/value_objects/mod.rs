//! Value objects - Immutable objects defined by their attributes

mod attribute;
mod flexible_value;
mod formula;
mod names;
mod stat_key;

pub use attribute::Attribute;
pub use flexible_value::FlexibleValue;
pub use formula::{EvaluationError, Formula, FormulaContext};
pub use names::CharacterName;
pub use stat_key::{CombatStat, StatKey};
