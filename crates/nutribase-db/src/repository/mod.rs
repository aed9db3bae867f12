//! # Repository Module
//!
//! Database access for the food catalogue, split by direction.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  FoodDocument ──► FoodRepository::insert / insert_batch                 │
//! │                      │  (one transaction, rows in order)                │
//! │                      └──► resolve_nutrient (same connection)            │
//! │                                                                         │
//! │                   FoodRepository::delete  (cascade, one transaction)   │
//! │                                                                         │
//! │  StoredFood ◄──── FoodAggregator::aggregate_all / get                   │
//! │                      (joined or fan-out)                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`FoodRepository`](food::FoodRepository) - Decomposition and cascade delete
//! - [`NutrientRepository`](nutrient::NutrientRepository) - Shared nutrient lookup
//! - [`FoodAggregator`](aggregate::FoodAggregator) - Document reads

pub mod aggregate;
pub mod food;
pub mod nutrient;
