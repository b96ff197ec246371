//! # Sale Repository
//!
//! Append-only sale records. One row per cart line or dispensed item.
//!
//! ## Revenue Identity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  total_revenue = unit price at decrement time × quantity_sold          │
//! │                                                                         │
//! │  Cart discounts live on the checkout response, not on these rows.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use rxpos_core::{Money, SaleRecord};

/// A sale row to insert.
#[derive(Debug, Clone)]
pub struct NewSaleRecord {
    pub inventory_id: i64,
    pub batch_number: String,
    pub name: String,
    pub quantity_sold: i64,
    pub total_revenue: Money,
    pub sold_by: i64,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    pub sale_date: DateTime<Utc>,
}

/// Repository for sale records, bound to one connection.
pub struct SaleRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SaleRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        SaleRepository { conn }
    }

    /// Inserts a sale record and returns its id.
    pub async fn insert(&mut self, record: &NewSaleRecord) -> DbResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO sales (
                inventory_id, batch_number, name, quantity_sold,
                total_revenue, sold_by, customer_name, notes, sale_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(record.inventory_id)
        .bind(&record.batch_number)
        .bind(&record.name)
        .bind(record.quantity_sold)
        .bind(record.total_revenue)
        .bind(record.sold_by)
        .bind(&record.customer_name)
        .bind(&record.notes)
        .bind(record.sale_date)
        .execute(&mut *self.conn)
        .await?;

        let id = result.last_insert_rowid();
        debug!(
            sale_id = id,
            batch_id = record.inventory_id,
            quantity = record.quantity_sold,
            revenue = %record.total_revenue,
            "Sale recorded"
        );

        Ok(id)
    }

    /// Gets a sale record by id.
    pub async fn get(&mut self, id: i64) -> DbResult<Option<SaleRecord>> {
        let record = sqlx::query_as::<_, SaleRecord>(
            r#"
            SELECT
                id, inventory_id, batch_number, name, quantity_sold,
                total_revenue, sold_by, customer_name, notes, sale_date
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(record)
    }

    /// All sale records drawn from one batch, oldest first.
    pub async fn list_for_batch(&mut self, inventory_id: i64) -> DbResult<Vec<SaleRecord>> {
        let records = sqlx::query_as::<_, SaleRecord>(
            r#"
            SELECT
                id, inventory_id, batch_number, name, quantity_sold,
                total_revenue, sold_by, customer_name, notes, sale_date
            FROM sales
            WHERE inventory_id = ?1
            ORDER BY id
            "#,
        )
        .bind(inventory_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(records)
    }

    /// Number of sale rows.
    pub async fn count(&mut self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{new_batch, test_db};

    fn record(inventory_id: i64, qty: i64, revenue: i64) -> NewSaleRecord {
        NewSaleRecord {
            inventory_id,
            batch_number: "PCM-001".to_string(),
            name: "Paracetamol 500mg".to_string(),
            quantity_sold: qty,
            total_revenue: Money::from_minor(revenue),
            sold_by: 1,
            customer_name: Some("Walk-in".to_string()),
            notes: Some("Payment: cash".to_string()),
            sale_date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let mut uow = db.begin().await.unwrap();
        let batch = uow.inventory().insert(&new_batch("PCM-001", 10, 1000)).await.unwrap();

        let id = uow.sales().insert(&record(batch.id, 2, 2000)).await.unwrap();
        let stored = uow.sales().get(id).await.unwrap().unwrap();

        assert_eq!(stored.inventory_id, batch.id);
        assert_eq!(stored.quantity_sold, 2);
        assert_eq!(stored.total_revenue, Money::from_minor(2000));
        assert_eq!(stored.notes.as_deref(), Some("Payment: cash"));
    }

    #[tokio::test]
    async fn test_list_for_batch_and_count() {
        let db = test_db().await;
        let mut uow = db.begin().await.unwrap();
        let batch = uow.inventory().insert(&new_batch("PCM-001", 10, 1000)).await.unwrap();

        uow.sales().insert(&record(batch.id, 1, 1000)).await.unwrap();
        uow.sales().insert(&record(batch.id, 3, 2700)).await.unwrap();

        let rows = uow.sales().list_for_batch(batch.id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].total_revenue, Money::from_minor(2700));
        assert_eq!(uow.sales().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected_by_schema() {
        let db = test_db().await;
        let mut uow = db.begin().await.unwrap();
        let batch = uow.inventory().insert(&new_batch("PCM-001", 10, 1000)).await.unwrap();

        assert!(uow.sales().insert(&record(batch.id, 0, 0)).await.is_err());
    }
}
