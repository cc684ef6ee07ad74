//! Flexible values - numbers that are either fixed or derived from a formula.

use serde::{Deserialize, Serialize};

use super::formula::{EvaluationError, Formula, FormulaContext};

/// A numeric catalog input: a constant, or a formula over character inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlexibleValue {
    /// Fixed number
    Fixed { value: i32 },
    /// Formula expression (e.g., "intelligence * 3 + level")
    Formula { expression: String },
}

impl FlexibleValue {
    /// Create a fixed value.
    pub fn fixed(value: i32) -> Self {
        FlexibleValue::Fixed { value }
    }

    /// Create a formula value.
    pub fn formula(expression: impl Into<String>) -> Self {
        FlexibleValue::Formula {
            expression: expression.into(),
        }
    }

    /// Resolve to an integer. Formula errors propagate; there is no fallback.
    pub fn evaluate(&self, ctx: &FormulaContext) -> Result<i32, EvaluationError> {
        match self {
            FlexibleValue::Fixed { value } => Ok(*value),
            FlexibleValue::Formula { expression } => Formula::parse(expression)?.evaluate(ctx),
        }
    }
}

impl From<i32> for FlexibleValue {
    fn from(value: i32) -> Self {
        FlexibleValue::fixed(value)
    }
}
