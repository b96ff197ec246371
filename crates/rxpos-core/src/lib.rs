//! # rxpos-core: Pure Domain Logic for Rx POS
//!
//! This crate holds the pharmacy's business rules as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Rx POS Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Dashboards (admin / pharmacist / cashier)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP JSON + bearer session            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 rxpos-api (axum routes + services)              │   │
//! │  │    checkout, dispense, prescriptions, supply receiving          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ rxpos-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ checkout  │  │ lifecycle │  │   │
//! │  │   │  Batch    │  │   Money   │  │ PricedLine│  │ Rx status │  │   │
//! │  │   │ SaleRecord│  │ Discount  │  │  Totals   │  │ PO status │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    rxpos-db (Storage Layer)                     │   │
//! │  │          SQLite unit of work, repositories, migrations          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (InventoryBatch, SaleRecord, Prescription, ...)
//! - [`money`] - Integer money, discount and markup rates
//! - [`checkout`] - Server-side cart pricing
//! - [`lifecycle`] - Prescription and supply order state machines
//! - [`error`] - Domain error types
//! - [`validation`] - Request validation
//!
//! ## Example Usage
//!
//! ```rust
//! use rxpos_core::checkout::{CheckoutTotals, PricedLine};
//! use rxpos_core::money::{DiscountRate, Money};
//!
//! # fn main() -> rxpos_core::CoreResult<()> {
//! let lines = vec![PricedLine::new(1, "Amoxicillin 500mg", "AMX-01", 2, Money::from_minor(1250), 8)?];
//! let totals = CheckoutTotals::compute(&lines, DiscountRate::from_bps(1000))?;
//!
//! assert_eq!(totals.subtotal.minor(), 2500);
//! assert_eq!(totals.discount.minor(), 250);
//! assert_eq!(totals.total.minor(), 2250);
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use lifecycle::{PrescriptionStatus, SupplyOrderStatus};
pub use money::{DiscountRate, MarkupRate, Money};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single checkout.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum units of one batch in a single line.
///
/// ## Business Reason
/// Catches keying slips (10000 instead of 100) at the counter.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Maximum units booked from one supply order line.
pub const MAX_RECEIPT_QUANTITY: i64 = 1_000_000;

/// Selling price of a received batch, as basis points of unit cost (130%).
pub const SUPPLY_MARKUP_BPS: u32 = 13_000;

/// Shelf life assumed for a received batch without an expiry date.
pub const DEFAULT_EXPIRY_MONTHS: u32 = 24;

/// Longest accepted batch number.
pub const MAX_BATCH_NUMBER_LEN: usize = 64;

/// Longest accepted free-text note or customer name.
pub const MAX_NOTE_LEN: usize = 500;
