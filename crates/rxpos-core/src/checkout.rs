//! # Checkout Math
//!
//! Server-side pricing of a cart. The only inputs are the prices read while
//! decrementing each batch and the validated discount rate. Client-sent
//! subtotal and total never reach this module.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  decrement(batch, qty) ──► BatchSnapshot { price, remaining, ... }     │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  PricedLine::new(...)      line_total = price × qty                    │
//! │          │                                                              │
//! │          ▼  (all lines)                                                 │
//! │  CheckoutTotals::compute   subtotal = Σ line_total                     │
//! │                            discount = subtotal × rate                  │
//! │                            total    = subtotal − discount              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::{DiscountRate, Money};
use crate::types::PaymentMethod;

// =============================================================================
// Priced Line
// =============================================================================

/// One cart line after its stock has been taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedLine {
    pub inventory_id: i64,
    pub name: String,
    pub batch_number: String,
    pub quantity: i64,
    /// Price read at decrement time.
    pub unit_price: Money,
    pub line_total: Money,
    /// Batch quantity left after this line.
    pub remaining_stock: i64,
}

impl PricedLine {
    /// Builds a line and computes its total from the server price.
    pub fn new(
        inventory_id: i64,
        name: impl Into<String>,
        batch_number: impl Into<String>,
        quantity: i64,
        unit_price: Money,
        remaining_stock: i64,
    ) -> CoreResult<Self> {
        Ok(PricedLine {
            inventory_id,
            name: name.into(),
            batch_number: batch_number.into(),
            quantity,
            unit_price,
            line_total: unit_price.multiply_quantity(quantity)?,
            remaining_stock,
        })
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Cart-level money.
///
/// `total == subtotal - discount` holds for every value this type produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

impl CheckoutTotals {
    /// Sums line totals and applies the discount.
    pub fn compute<'a>(
        lines: impl IntoIterator<Item = &'a PricedLine>,
        rate: DiscountRate,
    ) -> CoreResult<Self> {
        let subtotal = Money::checked_sum(lines.into_iter().map(|l| l.line_total))?;
        let discount = subtotal.discount_amount(rate)?;
        Ok(CheckoutTotals {
            subtotal,
            discount,
            total: subtotal.checked_sub(discount)?,
        })
    }
}

// =============================================================================
// Receipt Helpers
// =============================================================================

/// Display-only transaction reference: `TXN-<yyyymmddHHMMSS>-<user_id>`.
///
/// Two checkouts by the same user in the same second share a reference.
/// It is not an idempotency key.
pub fn transaction_reference(at: DateTime<Utc>, user_id: i64) -> String {
    format!("TXN-{}-{}", at.format("%Y%m%d%H%M%S"), user_id)
}

/// Note stored on every sale line of a checkout.
///
/// ```rust
/// use rxpos_core::checkout::payment_note;
/// use rxpos_core::PaymentMethod;
///
/// assert_eq!(payment_note(PaymentMethod::Card, None), "Payment: card");
/// assert_eq!(
///     payment_note(PaymentMethod::Cash, Some("0300-1234567")),
///     "Payment: cash; Phone: 0300-1234567"
/// );
/// ```
pub fn payment_note(method: PaymentMethod, customer_phone: Option<&str>) -> String {
    match customer_phone.map(str::trim).filter(|p| !p.is_empty()) {
        Some(phone) => format!("Payment: {}; Phone: {}", method, phone),
        None => format!("Payment: {}", method),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
