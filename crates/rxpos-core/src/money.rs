//! # Money Module
//!
//! The `Money` type plus the two rate types that act on it: a cart-level
//! [`DiscountRate`] and the supply [`MarkupRate`].
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every price in the pharmacy flows through integer minor units:        │
//! │                                                                         │
//! │  inventory.price ──► line total ──► subtotal ──► discount ──► total    │
//! │       ▲                                                                 │
//! │       └── supply unit_cost × 130%  (receiving a supply order)          │
//! │                                                                         │
//! │  Floats never enter the ledger. The only float we accept is the        │
//! │  client's discount percent, converted once into basis points.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rxpos_core::money::{DiscountRate, Money};
//!
//! let price = Money::from_minor(1000);
//! let line = price.multiply_quantity(4).unwrap();
//! assert_eq!(line.minor(), 4000);
//!
//! let discount = line.discount_amount(DiscountRate::from_bps(1000)).unwrap(); // 10%
//! assert_eq!(discount.minor(), 400);
//! ```
//!
//! Arithmetic is checked. Anything that would leave the `i64` range is
//! `CoreError::AmountOutOfRange`, never a wrap or a panic.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Basis points in 100%.
const BPS_PER_WHOLE: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Stored in SQLite as a plain `INTEGER` and serialized to JSON as a plain
/// number, so `Money::from_minor(1300)` appears as `1300` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use rxpos_core::money::Money;
    ///
    /// let price = Money::from_minor(1099);
    /// assert_eq!(price.minor(), 1099);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit remainder (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies a unit price by a quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Batch: Amoxicillin 500mg @ 1000
    /// Quantity: 4
    ///      │
    ///      ▼
    /// multiply_quantity(4) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line total / SaleRecord.total_revenue: 4000
    /// ```
    pub fn multiply_quantity(&self, qty: i64) -> CoreResult<Money> {
        self.0
            .checked_mul(qty)
            .map(Money)
            .ok_or(CoreError::AmountOutOfRange)
    }

    pub fn checked_add(self, other: Money) -> CoreResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or(CoreError::AmountOutOfRange)
    }

    pub fn checked_sub(self, other: Money) -> CoreResult<Money> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or(CoreError::AmountOutOfRange)
    }

    /// Adds up amounts, failing on the first overflow.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> CoreResult<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Returns the discount amount for this subtotal, rounded half up.
    ///
    /// Integer math: `(amount * bps + 5000) / 10000`. The +5000 is the 0.5
    /// rounding term. Never exceeds `self` because a valid rate is ≤ 100%.
    ///
    /// ## Example
    /// ```rust
    /// use rxpos_core::money::{DiscountRate, Money};
    ///
    /// let subtotal = Money::from_minor(999);
    /// let discount = subtotal.discount_amount(DiscountRate::from_bps(1250)).unwrap(); // 12.5%
    /// // 999 × 12.5% = 124.875 → 125
    /// assert_eq!(discount.minor(), 125);
    /// ```
    pub fn discount_amount(&self, rate: DiscountRate) -> CoreResult<Money> {
        scale_rounded(self.0, rate.bps())
    }

    /// Applies a markup and returns the marked-up price, rounded half up.
    ///
    /// ## Example
    /// ```rust
    /// use rxpos_core::money::{MarkupRate, Money};
    ///
    /// let unit_cost = Money::from_minor(1000);
    /// assert_eq!(unit_cost.apply_markup(MarkupRate::SUPPLY).unwrap().minor(), 1300);
    /// ```
    pub fn apply_markup(&self, rate: MarkupRate) -> CoreResult<Money> {
        scale_rounded(self.0, rate.bps())
    }
}

/// `amount * bps / 10000`, rounded half away from zero, computed in i128.
fn scale_rounded(amount: i64, bps: u32) -> CoreResult<Money> {
    let product = i128::from(amount) * i128::from(bps);
    let half = BPS_PER_WHOLE / 2;
    let rounded = if product >= 0 {
        (product + half) / BPS_PER_WHOLE
    } else {
        (product - half) / BPS_PER_WHOLE
    };
    i64::try_from(rounded)
        .map(Money)
        .map_err(|_| CoreError::AmountOutOfRange)
}

// =============================================================================
// Rates
// =============================================================================

/// A cart-level discount expressed in basis points (1000 = 10%).
///
/// The client submits a percent (`12.5`); the server converts it exactly
/// once into basis points and never touches the float again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// 100% in basis points.
    pub const MAX_BPS: u32 = 10_000;

    /// No discount.
    pub const fn none() -> Self {
        DiscountRate(0)
    }

    /// Creates a rate from basis points.
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Converts a client-supplied percent into basis points.
    ///
    /// Returns `None` for NaN, infinities and anything outside 0..=100.
    ///
    /// ## Example
    /// ```rust
    /// use rxpos_core::money::DiscountRate;
    ///
    /// assert_eq!(DiscountRate::from_percentage(12.5).map(|r| r.bps()), Some(1250));
    /// assert!(DiscountRate::from_percentage(120.0).is_none());
    /// ```
    pub fn from_percentage(percent: f64) -> Option<Self> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return None;
        }
        Some(DiscountRate((percent * 100.0).round() as u32))
    }

    /// Returns basis points.
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percent, for display and logs.
    pub fn as_percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Checks if this is a zero discount.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

/// A price markup in basis points (13000 = 130% of cost).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkupRate(u32);

impl MarkupRate {
    /// Selling price of a received supply batch: unit cost × 1.30.
    pub const SUPPLY: MarkupRate = MarkupRate(crate::SUPPLY_MARKUP_BPS);

    /// Creates a markup from basis points.
    pub const fn from_bps(bps: u32) -> Self {
        MarkupRate(bps)
    }

    /// Returns basis points.
    pub const fn bps(&self) -> u32 {
        self.0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering, `12.50`. Currency symbols are a UI concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_minor(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_minor(500)), "5.00");
        assert_eq!(format!("{}", Money::from_minor(-550)), "-5.50");
    }

    #[test]
    fn test_multiply_quantity_matches_dispense_revenue() {
        let price = Money::from_minor(1000);
        assert_eq!(price.multiply_quantity(4).unwrap().minor(), 4000);
    }

    #[test]
    fn test_multiply_quantity_overflow_is_an_error() {
        let price = Money::from_minor(i64::MAX / 2);
        assert!(matches!(price.multiply_quantity(3), Err(CoreError::AmountOutOfRange)));
    }

    #[test]
    fn test_supply_markup() {
        let markup = |minor| Money::from_minor(minor).apply_markup(MarkupRate::SUPPLY).unwrap();
        assert_eq!(markup(1000).minor(), 1300);
        // 333 × 1.3 = 432.9 → 433
        assert_eq!(markup(333).minor(), 433);
        assert_eq!(markup(0), Money::zero());
    }

    #[test]
    fn test_markup_out_of_range() {
        let cost = Money::from_minor(i64::MAX - 10);
        assert!(matches!(
            cost.apply_markup(MarkupRate::SUPPLY),
            Err(CoreError::AmountOutOfRange)
        ));
    }

    #[test]
    fn test_discount_rounds_half_up() {
        // 1005 × 10% = 100.5 → 101
        let d = Money::from_minor(1005).discount_amount(DiscountRate::from_bps(1000)).unwrap();
        assert_eq!(d.minor(), 101);
    }

    #[test]
    fn test_full_discount_never_exceeds_subtotal() {
        let subtotal = Money::from_minor(12_345);
        let d = subtotal.discount_amount(DiscountRate::from_bps(DiscountRate::MAX_BPS)).unwrap();
        assert_eq!(d, subtotal);

        let top = Money::from_minor(i64::MAX);
        assert_eq!(top.discount_amount(DiscountRate::from_bps(DiscountRate::MAX_BPS)).unwrap(), top);
    }

    #[test]
    fn test_discount_from_percentage() {
        assert_eq!(DiscountRate::from_percentage(0.0), Some(DiscountRate::none()));
        assert_eq!(DiscountRate::from_percentage(100.0).map(|r| r.bps()), Some(10_000));
        assert_eq!(DiscountRate::from_percentage(7.25).map(|r| r.bps()), Some(725));
        assert!(DiscountRate::from_percentage(-1.0).is_none());
        assert!(DiscountRate::from_percentage(f64::NAN).is_none());
        assert!(DiscountRate::from_percentage(f64::INFINITY).is_none());
    }

    #[test]
    fn test_checked_sum() {
        let total = Money::checked_sum([1000, 250, 4].map(Money::from_minor)).unwrap();
        assert_eq!(total.minor(), 1254);

        let overflow = Money::checked_sum([i64::MAX, 1].map(Money::from_minor));
        assert!(matches!(overflow, Err(CoreError::AmountOutOfRange)));
    }

    #[test]
    fn test_serializes_as_plain_number() {
        let json = serde_json::to_string(&Money::from_minor(1300)).unwrap();
        assert_eq!(json, "1300");
    }
}
