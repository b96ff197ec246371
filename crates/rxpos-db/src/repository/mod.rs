//! # Repository Module
//!
//! SQL for each table family, isolated behind typed methods.
//!
//! ## Connection-Bound Repositories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every repository borrows ONE connection: `Repo<'c> { &'c mut Conn }`  │
//! │                                                                         │
//! │  UnitOfWork ── uow.inventory() ──► InventoryRepository<'_>             │
//! │             ── uow.sales()     ──► SaleRepository<'_>                  │
//! │             ── ...                                                      │
//! │                                                                         │
//! │  Read-only callers can build one over a pooled connection:             │
//! │    let mut conn = db.acquire().await?;                                  │
//! │    SessionRepository::new(&mut conn).find_active(token)                │
//! │                                                                         │
//! │  Nothing here opens, commits or rolls back a transaction.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`InventoryRepository`](inventory::InventoryRepository) - Batches and the atomic decrement
//! - [`SaleRepository`](sale::SaleRepository) - Sale records
//! - [`PrescriptionRepository`](prescription::PrescriptionRepository) - Prescriptions and items
//! - [`SupplyOrderRepository`](supply_order::SupplyOrderRepository) - Supplier orders and lines
//! - [`AuditLogRepository`](audit::AuditLogRepository) - Audit trail
//! - [`SessionRepository`](session::SessionRepository) - Bearer token lookup

pub mod audit;
pub mod inventory;
pub mod prescription;
pub mod sale;
pub mod session;
pub mod supply_order;
