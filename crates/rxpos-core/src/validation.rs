//! # Validation Module
//!
//! Request validation for Rx POS. Everything here runs before a unit of
//! work is opened, so a rejected request never touches storage.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (serde)                                       │
//! │  └── JSON shape, numeric types                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required ids, positive quantities, cart size                      │
//! │  └── Discount range, payment method, batch number format               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Storage                                                      │
//! │  ├── Conditional decrement (stock)                                     │
//! │  ├── CHECK (quantity >= 0)                                             │
//! │  └── UNIQUE (batch_number)                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::DiscountRate;
use crate::types::PaymentMethod;
use crate::{
    MAX_BATCH_NUMBER_LEN, MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_NOTE_LEN, MAX_RECEIPT_QUANTITY,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a row id taken from a request body.
///
/// ## Example
/// ```rust
/// use rxpos_core::validation::validate_id;
///
/// assert_eq!(validate_id("order_id", Some(7)).unwrap(), 7);
/// assert!(validate_id("order_id", None).is_err());
/// assert!(validate_id("order_id", Some(0)).is_err());
/// ```
pub fn validate_id(field: &str, id: Option<i64>) -> ValidationResult<i64> {
    match id {
        None => Err(ValidationError::Required {
            field: field.to_string(),
        }),
        Some(id) if id <= 0 => Err(ValidationError::MustBePositive {
            field: field.to_string(),
        }),
        Some(id) => Ok(id),
    }
}

/// Rejects a request that names the same id twice.
pub fn validate_unique_ids<T, I>(field: &str, ids: I) -> ValidationResult<()>
where
    T: Eq + Hash + Display,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    for id in ids {
        if seen.contains(&id) {
            return Err(ValidationError::Duplicate {
                field: field.to_string(),
                value: id.to_string(),
            });
        }
        seen.insert(id);
    }
    Ok(())
}

// =============================================================================
// Quantity Validators
// =============================================================================

/// Validates a quantity to sell or dispense.
///
/// ## Rules
/// - Must be positive
/// - Must not exceed `MAX_ITEM_QUANTITY`
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a received quantity. Zero means "nothing arrived for this line".
pub fn validate_received_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "quantity_received".to_string(),
        });
    }
    if qty > MAX_RECEIPT_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity_received".to_string(),
            min: 0,
            max: MAX_RECEIPT_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a dispensed quantity against what the prescriber ordered.
pub fn validate_dispensed_quantity(qty: i64, prescribed: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity_dispensed".to_string(),
        });
    }
    if qty > prescribed {
        return Err(ValidationError::OutOfRange {
            field: "quantity_dispensed".to_string(),
            min: 1,
            max: prescribed,
        });
    }
    Ok(())
}

// =============================================================================
// Cart Validators
// =============================================================================

/// Validates the number of lines in a checkout.
pub fn validate_cart_size(lines: usize) -> CoreResult<()> {
    if lines == 0 {
        return Err(CoreError::EmptyCart);
    }
    if lines > MAX_CART_ITEMS {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        });
    }
    Ok(())
}

/// Validates one cart line and returns `(inventory_id, quantity)`.
///
/// ## Example
/// ```rust
/// use rxpos_core::validation::validate_cart_line;
///
/// assert_eq!(validate_cart_line(0, Some(3), Some(2)).unwrap(), (3, 2));
/// assert!(validate_cart_line(1, None, Some(2)).is_err());
/// assert!(validate_cart_line(2, Some(3), Some(0)).is_err());
/// ```
pub fn validate_cart_line(
    index: usize,
    inventory_id: Option<i64>,
    quantity: Option<i64>,
) -> CoreResult<(i64, i64)> {
    let invalid = |err: ValidationError| CoreError::InvalidLine {
        index,
        reason: err.to_string(),
    };

    let id = validate_id("inventory_id", inventory_id).map_err(invalid)?;
    let qty = quantity.ok_or_else(|| {
        invalid(ValidationError::Required {
            field: "quantity".to_string(),
        })
    })?;
    validate_quantity(qty).map_err(invalid)?;

    Ok((id, qty))
}

/// Validates the client discount percent.
///
/// ## Rules
/// - Missing means no discount
/// - Must be a finite number within 0..=100
/// - When `max_percent` is configured, must not exceed it
///
/// ## Example
/// ```rust
/// use rxpos_core::validation::validate_discount;
///
/// assert_eq!(validate_discount(Some(10.0), None).unwrap().bps(), 1000);
/// assert!(validate_discount(Some(25.0), Some(20.0)).is_err());
/// assert!(validate_discount(Some(-5.0), None).is_err());
/// ```
pub fn validate_discount(percent: Option<f64>, max_percent: Option<f64>) -> CoreResult<DiscountRate> {
    let Some(percent) = percent else {
        return Ok(DiscountRate::none());
    };

    let rate = DiscountRate::from_percentage(percent).ok_or_else(|| {
        CoreError::Validation(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: 100,
        })
    })?;

    if let Some(max) = max_percent {
        if percent > max {
            return Err(CoreError::DiscountNotAllowed {
                requested: percent,
                max,
            });
        }
    }

    Ok(rate)
}

/// Parses the payment method, defaulting to cash.
pub fn validate_payment_method(method: Option<&str>) -> ValidationResult<PaymentMethod> {
    match method.map(str::trim).filter(|m| !m.is_empty()) {
        None => Ok(PaymentMethod::default()),
        Some(m) => m.parse(),
    }
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a batch number.
///
/// ## Rules
/// - Must not be empty
/// - At most `MAX_BATCH_NUMBER_LEN` characters
/// - Letters, digits and `-` `_` `/` `.` only
///
/// ## Example
/// ```rust
/// use rxpos_core::validation::validate_batch_number;
///
/// assert!(validate_batch_number("AMX-2026/04").is_ok());
/// assert!(validate_batch_number("").is_err());
/// assert!(validate_batch_number("lot 7").is_err());
/// ```
pub fn validate_batch_number(batch_number: &str) -> ValidationResult<()> {
    let batch_number = batch_number.trim();

    if batch_number.is_empty() {
        return Err(ValidationError::Required {
            field: "batch_number".to_string(),
        });
    }

    if batch_number.len() > MAX_BATCH_NUMBER_LEN {
        return Err(ValidationError::TooLong {
            field: "batch_number".to_string(),
            max: MAX_BATCH_NUMBER_LEN,
        });
    }

    if !batch_number
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "batch_number".to_string(),
            reason: "must contain only letters, numbers, '-', '_', '/' and '.'".to_string(),
        });
    }

    Ok(())
}

/// Trims optional free text, turning blanks into `None`.
pub fn normalize_note(field: &str, text: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    if text.chars().count() > MAX_NOTE_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTE_LEN,
        });
    }

    Ok(Some(text.to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_cart_size() {
        assert!(matches!(validate_cart_size(0), Err(CoreError::EmptyCart)));
        assert!(validate_cart_size(1).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS).is_ok());
        assert!(matches!(
            validate_cart_size(MAX_CART_ITEMS + 1),
            Err(CoreError::CartTooLarge { .. })
        ));
    }

    #[test]
    fn test_cart_line_reports_index() {
        let err = validate_cart_line(3, Some(5), Some(-1)).unwrap_err();
        match err {
            CoreError::InvalidLine { index, reason } => {
                assert_eq!(index, 3);
                assert_eq!(reason, "quantity must be positive");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = validate_cart_line(0, None, Some(1)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid cart line 0: inventory_id is required");

        let err = validate_cart_line(1, Some(2), None).unwrap_err();
        assert_eq!(err.to_string(), "Invalid cart line 1: quantity is required");
    }

    #[test]
    fn test_discount_bounds() {
        assert_eq!(validate_discount(None, None).unwrap(), DiscountRate::none());
        assert_eq!(validate_discount(Some(100.0), None).unwrap().bps(), 10_000);
        assert!(validate_discount(Some(100.01), None).is_err());
        assert!(validate_discount(Some(f64::NAN), None).is_err());
    }

    #[test]
    fn test_discount_cap() {
        assert!(validate_discount(Some(20.0), Some(20.0)).is_ok());
        let err = validate_discount(Some(20.5), Some(20.0)).unwrap_err();
        assert!(matches!(err, CoreError::DiscountNotAllowed { .. }));
    }

    #[test]
    fn test_payment_method_defaults_to_cash() {
        assert_eq!(validate_payment_method(None).unwrap(), PaymentMethod::Cash);
        assert_eq!(validate_payment_method(Some("")).unwrap(), PaymentMethod::Cash);
        assert_eq!(validate_payment_method(Some("card")).unwrap(), PaymentMethod::Card);
        assert!(validate_payment_method(Some("barter")).is_err());
    }

    #[test]
    fn test_batch_number() {
        assert!(validate_batch_number("SO12-3-20260101").is_ok());
        assert!(validate_batch_number(&"X".repeat(MAX_BATCH_NUMBER_LEN + 1)).is_err());
        assert!(validate_batch_number("bad;drop").is_err());
    }

    #[test]
    fn test_received_and_dispensed_quantities() {
        assert!(validate_received_quantity(0).is_ok());
        assert!(validate_received_quantity(-1).is_err());
        assert!(validate_received_quantity(MAX_RECEIPT_QUANTITY).is_ok());
        assert!(matches!(
            validate_received_quantity(i64::MAX / 2 + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_dispensed_quantity(5, 5).is_ok());
        assert!(validate_dispensed_quantity(6, 5).is_err());
        assert!(validate_dispensed_quantity(0, 5).is_err());
    }

    #[test]
    fn test_unique_ids() {
        assert!(validate_unique_ids("item_id", [1, 2, 3]).is_ok());
        let err = validate_unique_ids("item_id", [1, 2, 1]).unwrap_err();
        assert_eq!(err.to_string(), "item_id '1' appears more than once");
    }

    #[test]
    fn test_normalize_note() {
        assert_eq!(normalize_note("notes", Some("  ")).unwrap(), None);
        assert_eq!(
            normalize_note("notes", Some(" walk-in ")).unwrap(),
            Some("walk-in".to_string())
        );
        assert!(normalize_note("notes", Some(&"n".repeat(MAX_NOTE_LEN + 1))).is_err());
    }
}
