//! # Validation Module
//!
//! Boundary checks on incoming food documents.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  ├── Field types, list shapes                                          │
//! │  └── Missing optional fields default to absent / empty                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any transaction opens)                   │
//! │  ├── name present, nutrient names present and unique                   │
//! │  └── no blank child values, numbers finite and non-negative            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE constraints                                     │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use nutribase_core::validation::validate_food_document;
//! use nutribase_core::FoodDocument;
//!
//! assert!(validate_food_document(&FoodDocument::named("Apple")).is_ok());
//! assert!(validate_food_document(&FoodDocument::named("  ")).is_err());
//! ```

use std::collections::HashSet;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{ChildFact, FoodDocument};
use crate::MAX_NAME_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Document Validators
// =============================================================================

/// Validates one document.
///
/// ## Rules
/// - `name` is required and at most [`MAX_NAME_LENGTH`] characters
/// - child fact values must not be blank
/// - every nutrient carries a non-blank name, unique within the document
///   (a food links to a nutrient at most once)
/// - calories, glycemic index and nutrient amounts, when given, are finite
///   and non-negative
pub fn validate_food_document(doc: &FoodDocument) -> ValidationResult<()> {
    validate_food_name(&doc.name)?;

    validate_amount("calories", doc.calories)?;
    validate_amount("glycemicIndex", doc.glycemic_index)?;

    for fact in ChildFact::ALL {
        for (i, value) in fact.values(doc).iter().enumerate() {
            if value.trim().is_empty() {
                return Err(ValidationError::required(format!("{}[{}]", fact, i)));
            }
        }
    }

    let mut seen = HashSet::new();
    for (i, nutrient) in doc.nutrients.iter().enumerate() {
        let name = nutrient.name.trim();
        if name.is_empty() {
            return Err(ValidationError::required(format!("nutrients[{}].name", i)));
        }
        if !seen.insert(name) {
            return Err(ValidationError::Duplicate {
                field: "nutrients".to_string(),
                value: name.to_string(),
            });
        }
        validate_amount(&format!("nutrients[{}].amount", i), nutrient.amount)?;
    }

    Ok(())
}

/// Validates every document of a batch before any of them is written.
///
/// ## Returns
/// * `Err(CoreError::Validation(EmptyBatch))` - no documents
/// * `Err(CoreError::InvalidDocument { index, .. })` - first invalid document
pub fn validate_batch(docs: &[FoodDocument]) -> CoreResult<()> {
    if docs.is_empty() {
        return Err(ValidationError::EmptyBatch.into());
    }

    for (index, doc) in docs.iter().enumerate() {
        validate_food_document(doc)
            .map_err(|source| CoreError::InvalidDocument { index, source })?;
    }

    Ok(())
}

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a food name.
///
/// ## Example
/// ```rust
/// use nutribase_core::validation::validate_food_name;
///
/// assert!(validate_food_name("Apple").is_ok());
/// assert!(validate_food_name("").is_err());
/// ```
pub fn validate_food_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

fn validate_amount(field: &str, value: Option<f64>) -> ValidationResult<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(ValidationError::InvalidNumber {
            field: field.to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
