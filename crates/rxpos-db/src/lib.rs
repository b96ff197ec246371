//! # rxpos-db: Database Layer for Rx POS
//!
//! SQLite storage for the pharmacy transaction core, via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Rx POS Data Flow                                │
//! │                                                                         │
//! │  HTTP handler → service (rxpos-api)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     rxpos-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  UnitOfWork   │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │───►│ (one tx)      │    │  (embedded)  │  │   │
//! │  │   │               │    │   │           │    │              │  │   │
//! │  │   │ SqlitePool    │    │   ▼           │    │ 001_init.sql │  │   │
//! │  │   │ WAL, busy     │    │ Repositories  │    │              │  │   │
//! │  │   │ timeout       │    │ inventory,... │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (rxpos.db)                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`unit_of_work`] - Transaction scope with repository accessors
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Per-table SQL
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rxpos_db::{Database, DbConfig, Decrement};
//!
//! let db = Database::new(DbConfig::new("rxpos.db")).await?;
//!
//! let mut uow = db.begin().await?;
//! match uow.inventory().decrement(batch_id, 2).await? {
//!     Decrement::Applied(snapshot) => { /* record the sale */ }
//!     _ => return uow.rollback().await,
//! }
//! uow.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use unit_of_work::UnitOfWork;

pub use repository::audit::{AuditLogRepository, NewAuditEntry};
pub use repository::inventory::{BatchSnapshot, Decrement, InventoryRepository, NewBatch};
pub use repository::prescription::{NewPrescription, NewPrescriptionItem, PrescriptionRepository};
pub use repository::sale::{NewSaleRecord, SaleRepository};
pub use repository::session::SessionRepository;
pub use repository::supply_order::{
    ItemReceipt, NewSupplyOrder, NewSupplyOrderItem, SupplyOrderRepository,
};
