//! Unified error types for the domain layer
//!
//! Provides a common error type that can be used across all domain operations,
//! enabling consistent error handling without forcing callers to use String or anyhow.

use thiserror::Error;

use crate::ids::TraitId;
use crate::value_objects::EvaluationError;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Parse error (for value objects)
    #[error("Parse error: {0}")]
    Parse(String),

    /// A trait selection was rejected; the selection store is unchanged
    #[error("Invalid selection for trait '{trait_id}': {reason}")]
    SelectionInvalid { trait_id: TraitId, reason: String },

    /// A flexible value could not be evaluated
    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
}

impl DomainError {
    /// Creates a validation error for business rule violations.
    ///
    /// Use this when domain invariants or constraints are violated:
    /// - Required fields are empty or missing
    /// - Values are outside allowed ranges
    ///
    /// # Example
    /// ```ignore
    /// if level == 0 {
    ///     return Err(DomainError::validation("Character level must be at least 1"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a parse error for string-to-type conversion failures.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a rejected-selection error for the given choice.
    pub fn selection_invalid(trait_id: &TraitId, reason: impl Into<String>) -> Self {
        Self::SelectionInvalid {
            trait_id: trait_id.clone(),
            reason: reason.into(),
        }
    }

    /// Whether this error is a rejected selection.
    pub fn is_selection_invalid(&self) -> bool {
        matches!(self, Self::SelectionInvalid { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = DomainError::validation("level cannot be zero");
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(err.to_string(), "Validation failed: level cannot be zero");
    }

    #[test]
    fn test_selection_invalid_error() {
        let err = DomainError::selection_invalid(&TraitId::from("boost_1"), "too many picks");
        assert!(err.is_selection_invalid());
        assert_eq!(
            err.to_string(),
            "Invalid selection for trait 'boost_1': too many picks"
        );
    }

    #[test]
    fn test_from_evaluation_error() {
        let err: DomainError = EvaluationError::Empty.into();
        assert!(matches!(err, DomainError::Evaluation(_)));
        assert!(err.to_string().contains("Empty formula"));
        assert!(!err.is_selection_invalid());
    }
}
