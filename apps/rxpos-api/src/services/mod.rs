//! # Service Layer
//!
//! The four transaction processors. Each call is one unit of work:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate request          (no storage touched; errors → 400)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.begin()                                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  first statement is a WRITE  (decrement / status compare-and-set)      │
//! │       │                      takes SQLite's write lock up front, so a  │
//! │       │                      concurrent writer waits on busy_timeout   │
//! │       ▼                                                                 │
//! │  remaining reads and writes                                             │
//! │       │                                                                 │
//! │       ├── any error ──► rollback ──► Err                                │
//! │       ▼                                                                 │
//! │  commit ──► audit.record(..) ──► Ok                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod checkout;
pub mod dispense;
pub mod prescription;
pub mod receiving;

pub use checkout::CheckoutService;
pub use dispense::DispenseService;
pub use prescription::PrescriptionService;
pub use receiving::ReceivingService;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ServiceError, ServiceResult};
use rxpos_core::{CoreError, CoreResult};
use rxpos_db::{BatchSnapshot, DbError, Decrement, UnitOfWork};

/// Who is performing an operation, as resolved from the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub ip_address: Option<String>,
}

impl Actor {
    pub fn new(user_id: i64, ip_address: Option<String>) -> Self {
        Actor {
            user_id,
            ip_address,
        }
    }
}

/// Success body for lifecycle actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    pub fn done(message: impl Into<String>) -> Self {
        ActionResponse {
            success: true,
            message: message.into(),
        }
    }
}

/// Commits on `Ok`, rolls back on `Err`.
pub(crate) async fn finish<T>(uow: UnitOfWork, result: ServiceResult<T>) -> ServiceResult<T> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(e) = uow.rollback().await {
                warn!(error = %e, "Rollback failed");
            }
            Err(err)
        }
    }
}

/// Takes `qty` units from a batch inside `uow`.
///
/// A refused decrement becomes the matching domain error. The caller
/// rolls back, so no earlier line of the same request survives it.
pub(crate) async fn take_stock(
    uow: &mut UnitOfWork,
    inventory_id: i64,
    qty: i64,
) -> ServiceResult<BatchSnapshot> {
    match uow.inventory().decrement(inventory_id, qty).await? {
        Decrement::Applied(snapshot) => Ok(snapshot),
        Decrement::NotFound => Err(CoreError::BatchNotFound(inventory_id).into()),
        Decrement::Insufficient {
            name,
            batch_number,
            available,
        } => Err(CoreError::InsufficientStock {
            name,
            batch_number,
            available,
            requested: qty,
        }
        .into()),
    }
}

/// Error for a status compare-and-set that matched no row.
///
/// `check` is the lifecycle transition re-run against the status read
/// after the miss.
pub(crate) fn refused<S>(check: CoreResult<S>) -> ServiceError {
    match check {
        Err(e) => e.into(),
        Ok(_) => DbError::Internal("status changed during compare-and-set".into()).into(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use chrono::{NaiveDate, Utc};
    use rxpos_core::Money;
    use rxpos_db::{
        Database, DbConfig, NewAuditEntry, NewBatch, NewPrescription, NewPrescriptionItem,
        NewSupplyOrder, NewSupplyOrderItem,
    };

    use crate::audit::AuditSink;

    /// Keeps every entry for assertions.
    #[derive(Default)]
    pub struct CollectingSink {
        pub entries: Mutex<Vec<NewAuditEntry>>,
    }

    impl CollectingSink {
        pub fn actions(&self) -> Vec<String> {
            self.entries
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.action.clone())
                .collect()
        }
    }

    impl AuditSink for CollectingSink {
        fn record(&self, entry: NewAuditEntry) {
            self.entries.lock().unwrap().push(entry);
        }
    }

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn sink() -> Arc<CollectingSink> {
        Arc::new(CollectingSink::default())
    }

    pub async fn seed_batch(db: &Database, batch_number: &str, quantity: i64, price: i64) -> i64 {
        let mut uow = db.begin().await.unwrap();
        let batch = uow
            .inventory()
            .insert(&NewBatch {
                name: format!("Medicine {batch_number}"),
                generic_name: None,
                category: None,
                batch_number: batch_number.to_string(),
                quantity,
                price: Money::from_minor(price),
                expiry_date: NaiveDate::from_ymd_opt(2028, 6, 30).unwrap(),
                created_by: None,
            })
            .await
            .unwrap();
        uow.commit().await.unwrap();
        batch.id
    }

    pub async fn batch_quantity(db: &Database, id: i64) -> i64 {
        let mut uow = db.begin().await.unwrap();
        uow.inventory().get_batch(id).await.unwrap().unwrap().quantity
    }

    pub async fn sale_count(db: &Database) -> i64 {
        let mut uow = db.begin().await.unwrap();
        uow.sales().count().await.unwrap()
    }

    /// A prescription with one item per quantity, still pending.
    pub async fn seed_prescription(db: &Database, quantities: &[i64]) -> (i64, Vec<i64>) {
        let mut uow = db.begin().await.unwrap();
        let id = uow
            .prescriptions()
            .insert(&NewPrescription {
                patient_name: "Grace Njeri".to_string(),
                patient_phone: None,
                doctor_name: Some("Dr. Kamau".to_string()),
                notes: None,
                created_by: Some(1),
                items: quantities
                    .iter()
                    .map(|q| NewPrescriptionItem {
                        medicine_name: "Amoxicillin 500mg".to_string(),
                        dosage: None,
                        instructions: None,
                        quantity_prescribed: *q,
                    })
                    .collect(),
            })
            .await
            .unwrap();
        let items = uow.prescriptions().items(id).await.unwrap();
        uow.commit().await.unwrap();
        (id, items.into_iter().map(|i| i.id).collect())
    }

    /// `lines` are `(quantity_ordered, unit_cost_minor)`.
    pub async fn seed_supply_order(db: &Database, lines: &[(i64, i64)]) -> (i64, Vec<i64>) {
        let mut uow = db.begin().await.unwrap();
        let id = uow
            .supply_orders()
            .insert(&NewSupplyOrder {
                supplier_name: "MedSupply Ltd".to_string(),
                notes: None,
                created_by: Some(1),
                items: lines
                    .iter()
                    .map(|(qty, cost)| NewSupplyOrderItem {
                        medicine_name: "Ventolin Inhaler".to_string(),
                        generic_name: Some("Salbutamol".to_string()),
                        category: Some("Respiratory".to_string()),
                        quantity_ordered: *qty,
                        unit_cost: Money::from_minor(*cost),
                    })
                    .collect(),
            })
            .await
            .unwrap();
        let items = uow.supply_orders().items(id).await.unwrap();
        uow.commit().await.unwrap();
        (id, items.into_iter().map(|i| i.id).collect())
    }

    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }
}
