//! # nutribase-core: Pure Document Logic for Nutribase
//!
//! The nested food document exchanged with clients, the catalogue of fact
//! categories that hang off a food, and the boundary validation applied
//! before anything is written. No I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Nutribase Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │        Presentation / routing (out of tree)                     │   │
//! │  │    JSON documents in ──►          ◄── JSON documents out        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ nutribase-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────────┐  ┌──────────────┐  ┌──────────────┐          │   │
//! │  │   │   types     │  │  validation  │  │    error     │          │   │
//! │  │   │ FoodDocument│  │  documents   │  │  CoreError   │          │   │
//! │  │   │ ChildFact   │  │  batches     │  │  Validation  │          │   │
//! │  │   └─────────────┘  └──────────────┘  └──────────────┘          │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  nutribase-db (Database Layer)                  │   │
//! │  │     decomposition, aggregation, cascade, migrations             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - FoodDocument, StoredFood, NutrientEntry, fact catalogues
//! - [`error`] - Domain error types
//! - [`validation`] - Input shape validation
//!
//! ## Example Usage
//!
//! ```rust
//! use nutribase_core::{validation::validate_food_document, FoodDocument};
//!
//! let doc: FoodDocument = serde_json::from_str(
//!     r#"{"name": "Apple", "varieties": ["Gala", "Fuji", "Gala"]}"#,
//! ).unwrap();
//! validate_food_document(&doc).unwrap();
//!
//! let canonical = doc.canonicalize();
//! assert_eq!(canonical.varieties, vec!["Fuji", "Gala"]);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a food name, in characters.
pub const MAX_NAME_LENGTH: usize = 200;
