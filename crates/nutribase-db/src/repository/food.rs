//! # Food Repository
//!
//! The write path: decomposing nested documents into normalized rows, and
//! the deletion cascade that removes them again.
//!
//! ## Decomposition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    SINGLE TRANSACTION (per call)                        │
//! │                                                                         │
//! │  1. INSERT INTO foods (...) RETURNING food_id                          │
//! │                                                                         │
//! │  2. For each child category, for each value:                           │
//! │       INSERT INTO <table> (food_id, <column>)                          │
//! │                                                                         │
//! │  3. For each present singleton:                                        │
//! │       INSERT INTO food_history / pesticides / botanical_information    │
//! │                                                                         │
//! │  4. For each nutrient entry:                                           │
//! │       resolve_nutrient(name, unit)  ── same connection                 │
//! │       INSERT INTO food_nutrients (food_id, nutrient_id, amount)        │
//! │                                                                         │
//! │  COMMIT ← all rows or none (a failed statement rolls back everything,  │
//! │           including nutrients created by this call)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Statements run strictly in order on one connection; no step starts
//! before the previous one finished.
//!
//! ## Cascade
//! Dependent tables have no `ON DELETE CASCADE`. [`FoodRepository::delete`]
//! clears every table in [`schema::dependent_tables`] and then the parent,
//! in one transaction. Shared nutrient rows stay.

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::nutrient::resolve_nutrient;
use crate::schema::{self, ChildTable};
use crate::transaction;
use nutribase_core::validation::{validate_batch, validate_food_document};
use nutribase_core::{ChildFact, FoodDocument, FoodId, SingletonFact};

/// Result of writing a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// Generated identifiers, in input order.
    pub food_ids: Vec<FoodId>,
}

/// Result of a cascade delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    /// False when no food had this identifier. Not an error.
    pub food_deleted: bool,

    /// Dependent rows removed across all fact and association tables.
    pub dependent_rows: u64,
}

/// Repository for food writes and deletes.
///
/// ## Usage
/// ```rust,ignore
/// let repo = FoodRepository::new(pool);
///
/// let id = repo.insert(&doc).await?;
/// let ids = repo.insert_batch(&docs).await?.food_ids;
/// let outcome = repo.delete(id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct FoodRepository {
    pool: SqlitePool,
}

impl FoodRepository {
    /// Creates a new FoodRepository.
    pub fn new(pool: SqlitePool) -> Self {
        FoodRepository { pool }
    }

    /// Decomposes one document and persists it atomically.
    ///
    /// ## Returns
    /// * `Ok(food_id)` - every row was committed
    /// * `Err(DbError::InvalidInput)` - rejected before any write
    /// * `Err(_)` - a statement failed; nothing was kept
    pub async fn insert(&self, doc: &FoodDocument) -> DbResult<FoodId> {
        validate_food_document(doc)?;

        debug!(name = %doc.name, rows = doc.dependent_row_count(), "Inserting food");

        let mut tx = transaction::begin(&self.pool).await?;
        let outcome = decompose(&mut tx, doc).await;
        let food_id = transaction::finish(tx, outcome).await?;

        info!(food_id, name = %doc.name, "Food stored");
        Ok(food_id)
    }

    /// Decomposes several documents in one transaction.
    ///
    /// Documents are written sequentially in input order. Either every
    /// document is stored or none is.
    ///
    /// ## Returns
    /// * `Err(DbError::InvalidInput)` - empty batch, or a document failed
    ///   validation (its index is in the error); nothing was written
    pub async fn insert_batch(&self, docs: &[FoodDocument]) -> DbResult<BatchOutcome> {
        validate_batch(docs)?;

        debug!(count = docs.len(), "Inserting food batch");

        let mut tx = transaction::begin(&self.pool).await?;
        let outcome = decompose_all(&mut tx, docs).await;
        let food_ids = transaction::finish(tx, outcome).await?;

        info!(count = food_ids.len(), "Food batch stored");
        Ok(BatchOutcome { food_ids })
    }

    /// Deletes a food and every row that references it.
    ///
    /// Deleting an identifier that does not exist succeeds with
    /// `food_deleted == false`.
    pub async fn delete(&self, food_id: FoodId) -> DbResult<DeleteOutcome> {
        debug!(food_id, "Deleting food");

        let mut tx = transaction::begin(&self.pool).await?;
        let outcome = cascade(&mut tx, food_id).await;
        let outcome = transaction::finish(tx, outcome).await?;

        if outcome.food_deleted {
            info!(food_id, dependent_rows = outcome.dependent_rows, "Food deleted");
        } else {
            debug!(food_id, "No food to delete");
        }
        Ok(outcome)
    }

    /// Counts stored foods.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM foods")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit-of-work bodies
// =============================================================================

async fn decompose_all(
    conn: &mut SqliteConnection,
    docs: &[FoodDocument],
) -> DbResult<Vec<FoodId>> {
    let mut food_ids = Vec::with_capacity(docs.len());
    for doc in docs {
        food_ids.push(decompose(conn, doc).await?);
    }
    Ok(food_ids)
}

/// Writes every row of `doc` on `conn`. The caller owns the transaction.
pub(crate) async fn decompose(
    conn: &mut SqliteConnection,
    doc: &FoodDocument,
) -> DbResult<FoodId> {
    let food_id: FoodId = sqlx::query_scalar(
        r#"
        INSERT INTO foods (
            name, category, description, serving_size, calories,
            glycemic_index, organic, allergens, environmental_impact,
            image_reference, cultural_significance
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        RETURNING food_id
        "#,
    )
    .bind(doc.name.trim())
    .bind(&doc.category)
    .bind(&doc.description)
    .bind(&doc.serving_size)
    .bind(doc.calories)
    .bind(doc.glycemic_index)
    .bind(doc.organic)
    .bind(&doc.allergens)
    .bind(&doc.environmental_impact)
    .bind(&doc.image_reference)
    .bind(&doc.cultural_significance)
    .fetch_one(&mut *conn)
    .await?;

    for fact in ChildFact::ALL {
        let values = fact.values(doc);
        if values.is_empty() {
            continue;
        }

        let ChildTable { table, column } = schema::child_table(fact);
        let sql = format!("INSERT INTO {table} (food_id, {column}) VALUES (?1, ?2)");
        for value in values {
            sqlx::query(&sql)
                .bind(food_id)
                .bind(value)
                .execute(&mut *conn)
                .await?;
        }
    }

    insert_singletons(conn, food_id, doc).await?;

    for entry in &doc.nutrients {
        let nutrient = resolve_nutrient(conn, &entry.name, entry.unit.as_deref()).await?;
        sqlx::query("INSERT INTO food_nutrients (food_id, nutrient_id, amount) VALUES (?1, ?2, ?3)")
            .bind(food_id)
            .bind(nutrient.id)
            .bind(entry.amount)
            .execute(&mut *conn)
            .await?;
    }

    Ok(food_id)
}

async fn insert_singletons(
    conn: &mut SqliteConnection,
    food_id: FoodId,
    doc: &FoodDocument,
) -> DbResult<()> {
    for fact in SingletonFact::ALL {
        if !fact.is_present(doc) {
            continue;
        }

        let table = schema::singleton_table(fact);
        let statement = match fact {
            SingletonFact::History => {
                sqlx::query(&format!("INSERT INTO {table} (food_id, history) VALUES (?1, ?2)"))
                    .bind(food_id)
                    .bind(&doc.history)
                    .execute(&mut *conn)
                    .await
            }
            SingletonFact::Pesticides => {
                sqlx::query(&format!("INSERT INTO {table} (food_id, information) VALUES (?1, ?2)"))
                    .bind(food_id)
                    .bind(&doc.pesticides)
                    .execute(&mut *conn)
                    .await
            }
            SingletonFact::BotanicalInformation => {
                let info = doc.botanical_information.clone().unwrap_or_default();
                sqlx::query(&format!(
                    "INSERT INTO {table} (food_id, family, genus, species) VALUES (?1, ?2, ?3, ?4)"
                ))
                .bind(food_id)
                .bind(info.family)
                .bind(info.genus)
                .bind(info.species)
                .execute(&mut *conn)
                .await
            }
        };
        statement?;
    }
    Ok(())
}

/// Removes `food_id` and all of its dependent rows on `conn`.
pub(crate) async fn cascade(
    conn: &mut SqliteConnection,
    food_id: FoodId,
) -> DbResult<DeleteOutcome> {
    let mut dependent_rows = 0;
    for table in schema::dependent_tables() {
        let sql = format!("DELETE FROM {table} WHERE food_id = ?1");
        dependent_rows += sqlx::query(&sql)
            .bind(food_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }

    let parent = sqlx::query("DELETE FROM foods WHERE food_id = ?1")
        .bind(food_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    Ok(DeleteOutcome {
        food_deleted: parent > 0,
        dependent_rows,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
