//! # Nutrient Repository
//!
//! The shared nutrient lookup table and its get-or-create resolver.
//!
//! ## Resolve
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve_nutrient(conn, "Vitamin C", Some("mg"))                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT ... ON CONFLICT (name) DO NOTHING RETURNING nutrient_id         │
//! │       │                                                                 │
//! │       ├── row returned ───────────────────────► { id, created: true }  │
//! │       │                                                                 │
//! │       └── no row (the name already exists)                             │
//! │              │                                                          │
//! │              ▼                                                          │
//! │           SELECT nutrient_id WHERE name = ? ──► { id, created: false } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The write comes first so a transaction opened for the resolve takes the
//! write lock on its first statement. A deferred transaction that read
//! before writing would fail with `database is locked` under WAL instead
//! of waiting for the busy timeout.
//!
//! The UNIQUE constraint on `nutrients.name` guarantees one row per name
//! even with concurrent writers. Names are matched exactly after trimming
//! surrounding whitespace; no case folding. The unit of an existing row is
//! never changed.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::transaction;
use nutribase_core::{Nutrient, NutrientId};

/// Outcome of a nutrient lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedNutrient {
    pub id: NutrientId,

    /// True when this call inserted the row.
    pub created: bool,
}

/// Finds the nutrient named `name` or creates it with `unit`.
///
/// Runs on the caller's connection so it joins the caller's transaction:
/// a rollback also removes a nutrient created here.
///
/// ## Arguments
/// * `conn` - Connection with an open transaction
/// * `name` - Natural key; surrounding whitespace is ignored
/// * `unit` - Recorded only when the row is created
pub async fn resolve_nutrient(
    conn: &mut SqliteConnection,
    name: &str,
    unit: Option<&str>,
) -> DbResult<ResolvedNutrient> {
    let name = name.trim();

    let inserted: Option<NutrientId> = sqlx::query_scalar(
        r#"
        INSERT INTO nutrients (name, unit)
        VALUES (?1, ?2)
        ON CONFLICT (name) DO NOTHING
        RETURNING nutrient_id
        "#,
    )
    .bind(name)
    .bind(unit)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = inserted {
        debug!(nutrient_id = id, name = %name, "Created nutrient");
        return Ok(ResolvedNutrient { id, created: true });
    }

    let id: NutrientId = sqlx::query_scalar("SELECT nutrient_id FROM nutrients WHERE name = ?1")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(ResolvedNutrient { id, created: false })
}

/// Repository for the shared nutrient table.
#[derive(Debug, Clone)]
pub struct NutrientRepository {
    pool: SqlitePool,
}

impl NutrientRepository {
    /// Creates a new NutrientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        NutrientRepository { pool }
    }

    /// Resolves a nutrient in a transaction of its own.
    ///
    /// Inside a food write use [`resolve_nutrient`] on the write's
    /// connection instead.
    pub async fn resolve(&self, name: &str, unit: Option<&str>) -> DbResult<ResolvedNutrient> {
        let mut tx = transaction::begin(&self.pool).await?;
        let outcome = resolve_nutrient(&mut tx, name, unit).await;
        transaction::finish(tx, outcome).await
    }

    /// Gets a nutrient by exact name.
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Nutrient>> {
        let nutrient = sqlx::query_as::<_, Nutrient>(
            "SELECT nutrient_id AS id, name, unit FROM nutrients WHERE name = ?1",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(nutrient)
    }

    /// Lists every nutrient, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Nutrient>> {
        let nutrients = sqlx::query_as::<_, Nutrient>(
            "SELECT nutrient_id AS id, name, unit FROM nutrients ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(nutrients)
    }

    /// Counts nutrient rows.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nutrients")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
