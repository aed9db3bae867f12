//! # Error Types
//!
//! Domain-specific error types for nutribase-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  nutribase-core errors (this file)                                     │
//! │  ├── CoreError        - Document-level failures                        │
//! │  └── ValidationError  - Input shape failures                           │
//! │                                                                         │
//! │  nutribase-db errors (separate crate)                                  │
//! │  └── DbError          - Storage failures (wraps ValidationError)       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError / DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Input shape errors are raised before any statement runs, so a rejected
//! document never opens a transaction.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Document-level errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A document in a batch failed validation.
    ///
    /// ## When This Occurs
    /// - `validate_batch` finds an invalid document; `index` is its
    ///   zero-based position in the batch
    #[error("Document {index} is invalid: {source}")]
    InvalidDocument {
        index: usize,
        #[source]
        source: ValidationError,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is negative, NaN or infinite.
    #[error("{field} must be a finite, non-negative number")]
    InvalidNumber { field: String },

    /// The same value appears twice where it must be unique.
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },

    /// A batch must carry at least one document.
    #[error("batch must contain at least one document")]
    EmptyBatch,
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("name");
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::Duplicate {
            field: "nutrients".to_string(),
            value: "Fiber".to_string(),
        };
        assert_eq!(err.to_string(), "nutrients 'Fiber' appears more than once");
    }

    #[test]
    fn test_invalid_document_names_index() {
        let err = CoreError::InvalidDocument {
            index: 2,
            source: ValidationError::required("name"),
        };
        assert_eq!(err.to_string(), "Document 2 is invalid: name is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::EmptyBatch.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
