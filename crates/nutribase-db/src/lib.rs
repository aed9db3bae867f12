//! # nutribase-db: Database Layer for Nutribase
//!
//! Stores nested food documents in normalized SQLite tables and reads them
//! back, using sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Nutribase Data Flow                              │
//! │                                                                         │
//! │  CLI / routing layer (JSON documents)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   nutribase-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ FoodRepository │    │ 001_init.sql │  │   │
//! │  │   │ SqlitePool    │◄───│ NutrientRepo   │    │              │  │   │
//! │  │   │ transaction   │    │ FoodAggregator │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │   SQLite: foods + 10 fact tables + nutrients + food_nutrients   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`transaction`] - Commit / rollback coordination
//! - [`schema`] - Where each fact category is stored
//! - [`error`] - Database error types
//! - [`repository`] - Write path, lookup resolver, read path
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nutribase_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./nutribase.db")).await?;
//!
//! let id = db.foods().insert(&doc).await?;
//! let foods = db.aggregator().aggregate_all().await?;
//! db.foods().delete(id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod schema;
pub mod transaction;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, ConfigError};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::aggregate::{AggregationStrategy, FoodAggregator};
pub use repository::food::{BatchOutcome, DeleteOutcome, FoodRepository};
pub use repository::nutrient::{resolve_nutrient, NutrientRepository, ResolvedNutrient};
