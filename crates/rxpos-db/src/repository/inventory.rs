//! # Inventory Repository
//!
//! The stock ledger: read a batch, take units out of it, put units in.
//!
//! ## Why the decrement is a single statement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two tills sell the last 6 units of batch 7 at the same moment         │
//! │                                                                         │
//! │  Read-then-write (unsafe)          Conditional UPDATE (this module)    │
//! │  ───────────────────────          ──────────────────────────────────   │
//! │  A: SELECT qty → 6                 A: UPDATE … WHERE qty >= 4 → 1 row  │
//! │  B: SELECT qty → 6                 B: UPDATE … WHERE qty >= 4 → 0 rows │
//! │  A: UPDATE qty = 2                      (waits for A's write lock,     │
//! │  B: UPDATE qty = 2   ← oversold         then sees qty = 2)             │
//! │                                    B: Insufficient { available: 2 }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The row count of the UPDATE is the only stock check. The follow-up
//! SELECT in the zero-row case only classifies the failure for the message.

use chrono::{NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use rxpos_core::{InventoryBatch, Money};

// =============================================================================
// Inputs and Outcomes
// =============================================================================

/// Batch state right after a successful decrement.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BatchSnapshot {
    pub id: i64,
    pub name: String,
    pub batch_number: String,
    /// Quantity left after the decrement.
    pub quantity: i64,
    /// Unit price at the moment of the decrement.
    pub price: Money,
}

/// Outcome of [`InventoryRepository::decrement`].
///
/// Stock shortfalls and unknown ids are expected results, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decrement {
    /// Units were taken. Carries the post-decrement state.
    Applied(BatchSnapshot),
    /// No batch with this id.
    NotFound,
    /// The batch holds fewer units than requested. Nothing changed.
    Insufficient {
        name: String,
        batch_number: String,
        available: i64,
    },
}

/// A batch to create (or top up) during receiving and seeding.
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub name: String,
    pub generic_name: Option<String>,
    pub category: Option<String>,
    pub batch_number: String,
    pub quantity: i64,
    pub price: Money,
    pub expiry_date: NaiveDate,
    pub created_by: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct StockLevel {
    name: String,
    batch_number: String,
    quantity: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for inventory batches, bound to one connection.
pub struct InventoryRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> InventoryRepository<'c> {
    /// Creates a repository over an open connection or transaction.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        InventoryRepository { conn }
    }

    /// Gets a batch by id.
    ///
    /// ## Returns
    /// * `Ok(Some(batch))` - Batch found
    /// * `Ok(None)` - No such batch
    pub async fn get_batch(&mut self, id: i64) -> DbResult<Option<InventoryBatch>> {
        let batch = sqlx::query_as::<_, InventoryBatch>(
            r#"
            SELECT
                id, name, generic_name, category, batch_number,
                quantity, price, expiry_date, created_by,
                created_at, updated_at
            FROM inventory
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(batch)
    }

    /// Takes `qty` units out of a batch, or nothing at all.
    ///
    /// ## SQL
    /// ```sql
    /// UPDATE inventory SET quantity = quantity - ?qty
    /// WHERE id = ?id AND quantity >= ?qty
    /// RETURNING ...
    /// ```
    /// Succeeds only when exactly one row was affected.
    ///
    /// ## Errors
    /// `qty <= 0` is rejected outright: a negative decrement would add stock.
    pub async fn decrement(&mut self, id: i64, qty: i64) -> DbResult<Decrement> {
        if qty <= 0 {
            return Err(DbError::CheckViolation(format!(
                "decrement quantity must be positive, got {qty}"
            )));
        }

        let applied = sqlx::query_as::<_, BatchSnapshot>(
            r#"
            UPDATE inventory
            SET quantity = quantity - ?2,
                updated_at = ?3
            WHERE id = ?1 AND quantity >= ?2
            RETURNING id, name, batch_number, quantity, price
            "#,
        )
        .bind(id)
        .bind(qty)
        .bind(Utc::now())
        .fetch_optional(&mut *self.conn)
        .await?;

        if let Some(snapshot) = applied {
            debug!(
                batch_id = id,
                taken = qty,
                remaining = snapshot.quantity,
                "Stock decremented"
            );
            return Ok(Decrement::Applied(snapshot));
        }

        let level = sqlx::query_as::<_, StockLevel>(
            "SELECT name, batch_number, quantity FROM inventory WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(match level {
            None => Decrement::NotFound,
            Some(level) => {
                debug!(
                    batch_id = id,
                    requested = qty,
                    available = level.quantity,
                    "Stock decrement refused"
                );
                Decrement::Insufficient {
                    name: level.name,
                    batch_number: level.batch_number,
                    available: level.quantity,
                }
            }
        })
    }

    /// Puts units into stock.
    ///
    /// If a batch with the same batch number AND expiry date exists, its
    /// quantity grows by `batch.quantity` and its price is left alone.
    /// Otherwise a new batch row is created.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` when the batch number exists with a
    /// different expiry date.
    pub async fn increment(&mut self, batch: &NewBatch) -> DbResult<InventoryBatch> {
        if batch.quantity <= 0 {
            return Err(DbError::CheckViolation(format!(
                "increment quantity must be positive, got {}",
                batch.quantity
            )));
        }

        let topped_up = sqlx::query_as::<_, InventoryBatch>(
            r#"
            UPDATE inventory
            SET quantity = quantity + ?1,
                updated_at = ?4
            WHERE batch_number = ?2 AND expiry_date = ?3
            RETURNING
                id, name, generic_name, category, batch_number,
                quantity, price, expiry_date, created_by,
                created_at, updated_at
            "#,
        )
        .bind(batch.quantity)
        .bind(&batch.batch_number)
        .bind(batch.expiry_date)
        .bind(Utc::now())
        .fetch_optional(&mut *self.conn)
        .await?;

        if let Some(existing) = topped_up {
            debug!(
                batch_id = existing.id,
                added = batch.quantity,
                "Existing batch topped up"
            );
            return Ok(existing);
        }

        self.insert(batch).await
    }

    /// Inserts a new batch row.
    pub async fn insert(&mut self, batch: &NewBatch) -> DbResult<InventoryBatch> {
        let now = Utc::now();

        let created = sqlx::query_as::<_, InventoryBatch>(
            r#"
            INSERT INTO inventory (
                name, generic_name, category, batch_number,
                quantity, price, expiry_date, created_by,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            RETURNING
                id, name, generic_name, category, batch_number,
                quantity, price, expiry_date, created_by,
                created_at, updated_at
            "#,
        )
        .bind(&batch.name)
        .bind(&batch.generic_name)
        .bind(&batch.category)
        .bind(&batch.batch_number)
        .bind(batch.quantity)
        .bind(batch.price)
        .bind(batch.expiry_date)
        .bind(batch.created_by)
        .bind(now)
        .fetch_one(&mut *self.conn)
        .await?;

        debug!(
            batch_id = created.id,
            batch_number = %created.batch_number,
            quantity = created.quantity,
            "Batch created"
        );

        Ok(created)
    }

    /// Total units on hand across all batches.
    pub async fn total_units(&mut self) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM inventory")
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(total)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{new_batch, test_db};

    #[tokio::test]
    async fn test_get_batch_missing() {
        let db = test_db().await;
        let mut uow = db.begin().await.unwrap();
        assert!(uow.inventory().get_batch(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_decrement_applies_and_reports_remaining() {
        let db = test_db().await;
        let mut uow = db.begin().await.unwrap();
        let batch = uow.inventory().insert(&new_batch("PCM-001", 10, 1000)).await.unwrap();

        let outcome = uow.inventory().decrement(batch.id, 4).await.unwrap();
        match outcome {
            Decrement::Applied(snapshot) => {
                assert_eq!(snapshot.quantity, 6);
                assert_eq!(snapshot.price, Money::from_minor(1000));
                assert_eq!(snapshot.batch_number, "PCM-001");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let stored = uow.inventory().get_batch(batch.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 6);
    }

    #[tokio::test]
    async fn test_decrement_insufficient_leaves_stock_untouched() {
        let db = test_db().await;
        let mut uow = db.begin().await.unwrap();
        let batch = uow.inventory().insert(&new_batch("PCM-002", 10, 1000)).await.unwrap();

        let outcome = uow.inventory().decrement(batch.id, 15).await.unwrap();
        assert_eq!(
            outcome,
            Decrement::Insufficient {
                name: "Paracetamol 500mg".to_string(),
                batch_number: "PCM-002".to_string(),
                available: 10,
            }
        );

        let stored = uow.inventory().get_batch(batch.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 10);
    }

    #[tokio::test]
    async fn test_decrement_to_exactly_zero() {
        let db = test_db().await;
        let mut uow = db.begin().await.unwrap();
        let batch = uow.inventory().insert(&new_batch("PCM-003", 3, 500)).await.unwrap();

        assert!(matches!(
            uow.inventory().decrement(batch.id, 3).await.unwrap(),
            Decrement::Applied(BatchSnapshot { quantity: 0, .. })
        ));
        assert!(matches!(
            uow.inventory().decrement(batch.id, 1).await.unwrap(),
            Decrement::Insufficient { available: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_decrement_unknown_batch() {
        let db = test_db().await;
        let mut uow = db.begin().await.unwrap();
        assert_eq!(
            uow.inventory().decrement(404, 1).await.unwrap(),
            Decrement::NotFound
        );
    }

    #[tokio::test]
    async fn test_decrement_rejects_non_positive_quantity() {
        let db = test_db().await;
        let mut uow = db.begin().await.unwrap();
        let batch = uow.inventory().insert(&new_batch("PCM-004", 3, 500)).await.unwrap();

        assert!(uow.inventory().decrement(batch.id, 0).await.is_err());
        assert!(uow.inventory().decrement(batch.id, -5).await.is_err());
        let stored = uow.inventory().get_batch(batch.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 3);
    }

    #[tokio::test]
    async fn test_increment_creates_then_tops_up() {
        let db = test_db().await;
        let mut uow = db.begin().await.unwrap();

        let first = uow.inventory().increment(&new_batch("AMX-100", 50, 1300)).await.unwrap();
        assert_eq!(first.quantity, 50);

        let mut again = new_batch("AMX-100", 20, 9999);
        again.expiry_date = first.expiry_date;
        let second = uow.inventory().increment(&again).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.quantity, 70);
        assert_eq!(second.price, Money::from_minor(1300));
    }

    #[tokio::test]
    async fn test_increment_conflicting_expiry_is_duplicate() {
        let db = test_db().await;
        let mut uow = db.begin().await.unwrap();

        uow.inventory().increment(&new_batch("AMX-200", 5, 100)).await.unwrap();

        let mut clash = new_batch("AMX-200", 5, 100);
        clash.expiry_date = NaiveDate::from_ymd_opt(2031, 6, 30).unwrap();
        let err = uow.inventory().increment(&clash).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_rolled_back_decrement_is_invisible() {
        let db = test_db().await;
        let id = {
            let mut uow = db.begin().await.unwrap();
            let b = uow.inventory().insert(&new_batch("PCM-005", 10, 100)).await.unwrap();
            uow.commit().await.unwrap();
            b.id
        };

        let mut uow = db.begin().await.unwrap();
        uow.inventory().decrement(id, 7).await.unwrap();
        uow.rollback().await.unwrap();

        let mut uow = db.begin().await.unwrap();
        let stored = uow.inventory().get_batch(id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 10);
    }
}
