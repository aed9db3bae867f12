//! # Transaction Coordinator
//!
//! Every write runs as one unit of work on one pooled connection.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Unit Of Work                                        │
//! │                                                                         │
//! │  begin(pool) ── acquire connection, BEGIN                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  work(&mut *tx) ── every statement on the same connection              │
//! │       │                                                                 │
//! │       ├── Ok(value) ──► COMMIT ──► Ok(value)                           │
//! │       │                  └─ commit error ──► TransactionFailed         │
//! │       │                                                                 │
//! │       └── Err(e) ─────► ROLLBACK ──► Err(e)  (original error kept)     │
//! │                          └─ rollback error is logged, never returned   │
//! │                                                                         │
//! │  The connection returns to the pool when the transaction is consumed,  │
//! │  on every path.                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let mut tx = transaction::begin(&pool).await?;
//! let outcome = write_rows(&mut tx, &doc).await;
//! transaction::finish(tx, outcome).await
//! ```
//!
//! Work functions take `&mut SqliteConnection` so they cannot reach the
//! pool; with a single-connection pool a second acquire would wait forever.

use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

/// Acquires a connection and opens a transaction on it.
pub async fn begin(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    let tx = pool.begin().await?;
    debug!("Transaction started");
    Ok(tx)
}

/// Ends `tx` according to `outcome`.
///
/// ## Returns
/// * `Ok(value)` - work succeeded and was committed
/// * `Err(DbError::TransactionFailed)` - work succeeded but the commit failed
/// * `Err(e)` - the work's own error, after rolling back
pub async fn finish<T>(tx: Transaction<'_, Sqlite>, outcome: DbResult<T>) -> DbResult<T> {
    match outcome {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            debug!("Transaction committed");
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(
                    error = %rollback_err,
                    cause = %err,
                    "Rollback failed after aborted work"
                );
            } else {
                debug!(cause = %err, "Transaction rolled back");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn count_foods(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM foods")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_finish_commits_on_success() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut tx = begin(db.pool()).await.unwrap();
        let outcome: DbResult<()> = sqlx::query("INSERT INTO foods (name) VALUES ('Apple')")
            .execute(&mut *tx)
            .await
            .map(|_| ())
            .map_err(DbError::from);
        finish(tx, outcome).await.unwrap();

        assert_eq!(count_foods(&db).await, 1);
    }

    #[tokio::test]
    async fn test_finish_rolls_back_and_keeps_original_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut tx = begin(db.pool()).await.unwrap();
        sqlx::query("INSERT INTO foods (name) VALUES ('Apple')")
            .execute(&mut *tx)
            .await
            .unwrap();
        let outcome: DbResult<()> = Err(DbError::QueryFailed("second insert".to_string()));

        let err = finish(tx, outcome).await.unwrap_err();
        assert!(matches!(err, DbError::QueryFailed(ref m) if m == "second insert"));

        // Single-connection pool: this would time out if the connection leaked
        assert_eq!(count_foods(&db).await, 0);
    }
}
