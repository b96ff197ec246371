//! # Unit of Work
//!
//! One request, one SQLite transaction.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  let mut uow = db.begin().await?;            BEGIN                      │
//! │                                                                         │
//! │  uow.inventory().decrement(7, 4)       ──┐                              │
//! │  uow.sales().insert(record)              ├─ same connection, same tx    │
//! │  uow.prescriptions().set_dispensed(..) ──┘                              │
//! │                                                                         │
//! │  uow.commit().await?                         COMMIT   (all visible)     │
//! │  uow.rollback().await? / drop(uow)           ROLLBACK (nothing visible) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories borrow the transaction's connection mutably, so only one is
//! live at a time. Grab a fresh one per call: `uow.sales().insert(..)`.

use sqlx::{Sqlite, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::audit::AuditLogRepository;
use crate::repository::inventory::InventoryRepository;
use crate::repository::prescription::PrescriptionRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::session::SessionRepository;
use crate::repository::supply_order::SupplyOrderRepository;

/// An open transaction plus typed repository access.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        UnitOfWork { tx }
    }

    pub fn inventory(&mut self) -> InventoryRepository<'_> {
        InventoryRepository::new(&mut self.tx)
    }

    pub fn sales(&mut self) -> SaleRepository<'_> {
        SaleRepository::new(&mut self.tx)
    }

    pub fn prescriptions(&mut self) -> PrescriptionRepository<'_> {
        PrescriptionRepository::new(&mut self.tx)
    }

    pub fn supply_orders(&mut self) -> SupplyOrderRepository<'_> {
        SupplyOrderRepository::new(&mut self.tx)
    }

    pub fn audit_log(&mut self) -> AuditLogRepository<'_> {
        AuditLogRepository::new(&mut self.tx)
    }

    pub fn sessions(&mut self) -> SessionRepository<'_> {
        SessionRepository::new(&mut self.tx)
    }

    /// Makes every write in this unit visible.
    pub async fn commit(self) -> DbResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!("Unit of work committed");
        Ok(())
    }

    /// Discards every write in this unit.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!("Unit of work rolled back");
        Ok(())
    }
}
