//! # Supply Order Repository
//!
//! Supplier orders, their lines, and receipt bookkeeping. Status writes are
//! compare-and-set on the current status, like prescriptions.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use rxpos_core::{Money, SupplyOrder, SupplyOrderItem, SupplyOrderStatus};

/// A supply order to insert, lines included.
#[derive(Debug, Clone)]
pub struct NewSupplyOrder {
    pub supplier_name: String,
    pub notes: Option<String>,
    pub created_by: Option<i64>,
    pub items: Vec<NewSupplyOrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewSupplyOrderItem {
    pub medicine_name: String,
    pub generic_name: Option<String>,
    pub category: Option<String>,
    pub quantity_ordered: i64,
    pub unit_cost: Money,
}

/// What arrived for one order line.
#[derive(Debug, Clone)]
pub struct ItemReceipt {
    pub item_id: i64,
    pub order_id: i64,
    pub quantity_received: i64,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    /// Batch the units went into. `None` when nothing arrived.
    pub inventory_id: Option<i64>,
}

/// Repository for supply orders, bound to one connection.
pub struct SupplyOrderRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SupplyOrderRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        SupplyOrderRepository { conn }
    }

    /// Inserts a pending order and its lines. Returns the new id.
    pub async fn insert(&mut self, order: &NewSupplyOrder) -> DbResult<i64> {
        let now = Utc::now();

        let id = sqlx::query(
            r#"
            INSERT INTO supply_orders (
                supplier_name, status, notes, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(&order.supplier_name)
        .bind(SupplyOrderStatus::Pending)
        .bind(&order.notes)
        .bind(order.created_by)
        .bind(now)
        .execute(&mut *self.conn)
        .await?
        .last_insert_rowid();

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO supply_order_items (
                    order_id, medicine_name, generic_name, category,
                    quantity_ordered, unit_cost
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(id)
            .bind(&item.medicine_name)
            .bind(&item.generic_name)
            .bind(&item.category)
            .bind(item.quantity_ordered)
            .bind(item.unit_cost)
            .execute(&mut *self.conn)
            .await?;
        }

        debug!(order_id = id, lines = order.items.len(), "Supply order created");
        Ok(id)
    }

    /// Gets an order by id.
    pub async fn get(&mut self, id: i64) -> DbResult<Option<SupplyOrder>> {
        let order = sqlx::query_as::<_, SupplyOrder>(
            r#"
            SELECT
                id, supplier_name, status, notes, created_by,
                received_by, received_at, created_at, updated_at
            FROM supply_orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(order)
    }

    /// Lines of an order, in insertion order.
    pub async fn items(&mut self, order_id: i64) -> DbResult<Vec<SupplyOrderItem>> {
        let items = sqlx::query_as::<_, SupplyOrderItem>(
            r#"
            SELECT
                id, order_id, medicine_name, generic_name, category,
                quantity_ordered, unit_cost, quantity_received,
                batch_number, expiry_date, inventory_id
            FROM supply_order_items
            WHERE order_id = ?1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(items)
    }

    /// Moves the order from `from` to `to`. `false` if it was no longer `from`.
    pub async fn set_status(
        &mut self,
        id: i64,
        from: SupplyOrderStatus,
        to: SupplyOrderStatus,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE supply_orders SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(at)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Marks the order received if it is still `from`.
    pub async fn set_received(
        &mut self,
        id: i64,
        from: SupplyOrderStatus,
        receiver: i64,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE supply_orders
            SET status = ?3,
                received_by = ?4,
                received_at = ?5,
                updated_at = ?5
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(SupplyOrderStatus::Received)
        .bind(receiver)
        .bind(at)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Stores what arrived for one line. `false` if the line is not part of
    /// the order or was already received.
    pub async fn record_item_receipt(&mut self, receipt: &ItemReceipt) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE supply_order_items
            SET quantity_received = ?3,
                batch_number = ?4,
                expiry_date = ?5,
                inventory_id = ?6
            WHERE id = ?1
              AND order_id = ?2
              AND quantity_received IS NULL
            "#,
        )
        .bind(receipt.item_id)
        .bind(receipt.order_id)
        .bind(receipt.quantity_received)
        .bind(&receipt.batch_number)
        .bind(receipt.expiry_date)
        .bind(receipt.inventory_id)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{new_supply_order, test_db};

    #[tokio::test]
    async fn test_insert_get_and_items() {
        let db = test_db().await;
        let mut uow = db.begin().await.unwrap();

        let id = uow.supply_orders().insert(&new_supply_order(&[(50, 1000)])).await.unwrap();
        let order = uow.supply_orders().get(id).await.unwrap().unwrap();
        assert_eq!(order.status, SupplyOrderStatus::Pending);
        assert_eq!(order.supplier_name, "MedSupply Ltd");

        let items = uow.supply_orders().items(id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_cost, Money::from_minor(1000));
        assert!(items[0].quantity_received.is_none());
    }

    #[tokio::test]
    async fn test_status_compare_and_set() {
        let db = test_db().await;
        let mut uow = db.begin().await.unwrap();
        let id = uow.supply_orders().insert(&new_supply_order(&[(5, 100)])).await.unwrap();
        let now = Utc::now();

        assert!(uow
            .supply_orders()
            .set_status(id, SupplyOrderStatus::Pending, SupplyOrderStatus::Ordered, now)
            .await
            .unwrap());
        assert!(!uow
            .supply_orders()
            .set_received(id, SupplyOrderStatus::Pending, 2, now)
            .await
            .unwrap());
        assert!(uow
            .supply_orders()
            .set_received(id, SupplyOrderStatus::Ordered, 2, now)
            .await
            .unwrap());

        let order = uow.supply_orders().get(id).await.unwrap().unwrap();
        assert_eq!(order.status, SupplyOrderStatus::Received);
        assert_eq!(order.received_by, Some(2));
    }

    #[tokio::test]
    async fn test_item_receipt_recorded_once() {
        let db = test_db().await;
        let mut uow = db.begin().await.unwrap();
        let id = uow.supply_orders().insert(&new_supply_order(&[(5, 100)])).await.unwrap();
        let item = uow.supply_orders().items(id).await.unwrap().remove(0);

        let receipt = ItemReceipt {
            item_id: item.id,
            order_id: id,
            quantity_received: 5,
            batch_number: Some("SO1-1-20261016".to_string()),
            expiry_date: NaiveDate::from_ymd_opt(2028, 10, 16),
            inventory_id: Some(3),
        };
        assert!(uow.supply_orders().record_item_receipt(&receipt).await.unwrap());
        assert!(!uow.supply_orders().record_item_receipt(&receipt).await.unwrap());

        let item = uow.supply_orders().items(id).await.unwrap().remove(0);
        assert_eq!(item.quantity_received, Some(5));
        assert_eq!(item.inventory_id, Some(3));
    }
}
