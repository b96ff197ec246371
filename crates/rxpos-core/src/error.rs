//! # Error Types
//!
//! Domain-specific error types for rxpos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  rxpos-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations (stock, state, ...)   │
//! │  └── ValidationError  - Request shape failures, checked before storage │
//! │                                                                         │
//! │  rxpos-db errors (separate crate)                                      │
//! │  └── DbError          - Storage failures                               │
//! │                                                                         │
//! │  rxpos-api errors (in app)                                             │
//! │  └── ApiError         - `{ success: false, message }` + HTTP status    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                          DbError  ──┴──► ServiceError → ApiError       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant is an expected outcome of a well-formed request (bad stock
/// level, wrong lifecycle state, unknown id). None of them indicate a fault.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Checkout submitted with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A cart line is missing its inventory id or has a bad quantity.
    ///
    /// `index` is zero-based, matching the request array.
    #[error("Invalid cart line {index}: {reason}")]
    InvalidLine { index: usize, reason: String },

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Inventory batch does not exist.
    #[error("Inventory batch not found: {0}")]
    BatchNotFound(i64),

    /// Insufficient stock to complete a sale or dispense.
    ///
    /// ## When This Occurs
    /// The conditional decrement affected zero rows because the batch holds
    /// fewer units than requested at the moment the write was attempted.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (Paracetamol × 15)
    ///      │
    ///      ▼
    /// UPDATE ... WHERE quantity >= 15   → 0 rows
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Paracetamol 500mg", available: 10, requested: 15 }
    ///      │
    ///      ▼
    /// Whole cart rolled back, cashier sees "available: 10"
    /// ```
    #[error(
        "Insufficient stock for {name} (batch {batch_number}): available: {available}, requested: {requested}"
    )]
    InsufficientStock {
        name: String,
        batch_number: String,
        available: i64,
        requested: i64,
    },

    /// Prescription does not exist.
    #[error("Prescription not found: {0}")]
    PrescriptionNotFound(i64),

    /// Prescription item id does not belong to the prescription.
    #[error("Prescription {prescription_id} has no item {item_id}")]
    PrescriptionItemNotFound { prescription_id: i64, item_id: i64 },

    /// Prescription item already carries a dispensed quantity.
    #[error("Prescription item {item_id} has already been dispensed")]
    ItemAlreadyDispensed { item_id: i64 },

    /// Supply order does not exist.
    #[error("Supply order not found: {0}")]
    SupplyOrderNotFound(i64),

    /// Supply order item id does not belong to the order.
    #[error("Supply order {order_id} has no item {item_id}")]
    SupplyOrderItemNotFound { order_id: i64, item_id: i64 },

    /// A lifecycle transition was attempted from a state that forbids it.
    ///
    /// ## When This Occurs
    /// - Dispensing a `pending` prescription
    /// - Verifying a prescription twice
    /// - Receiving a supply order that is already `received` or `cancelled`
    #[error("Cannot {action} {entity} {id}: current status is {from}")]
    InvalidTransition {
        entity: &'static str,
        id: i64,
        from: String,
        action: &'static str,
    },

    /// Discount exceeds the configured server-side cap.
    #[error("Discount of {requested}% exceeds the maximum allowed {max}%")]
    DiscountNotAllowed { requested: f64, max: f64 },

    /// A price, line total or sum left the representable range.
    #[error("Amount exceeds the supported range")]
    AmountOutOfRange,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// True for the "unknown id" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::BatchNotFound(_)
                | CoreError::PrescriptionNotFound(_)
                | CoreError::PrescriptionItemNotFound { .. }
                | CoreError::SupplyOrderNotFound(_)
                | CoreError::SupplyOrderItemNotFound { .. }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before a unit of work is opened, so they never touch storage.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., bad batch number, bad date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// The same id appears twice in one request.
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_mentions_available() {
        let err = CoreError::InsufficientStock {
            name: "Paracetamol 500mg".to_string(),
            batch_number: "PCM-001".to_string(),
            available: 10,
            requested: 15,
        };
        let message = err.to_string();
        assert!(message.contains("available: 10"));
        assert!(message.contains("requested: 15"));
    }

    #[test]
    fn test_transition_message() {
        let err = CoreError::InvalidTransition {
            entity: "prescription",
            id: 7,
            from: "pending".to_string(),
            action: "dispense",
        };
        assert_eq!(
            err.to_string(),
            "Cannot dispense prescription 7: current status is pending"
        );
    }

    #[test]
    fn test_not_found_family() {
        assert!(CoreError::BatchNotFound(1).is_not_found());
        assert!(CoreError::SupplyOrderNotFound(1).is_not_found());
        assert!(!CoreError::EmptyCart.is_not_found());
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "inventory_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Validation error: inventory_id is required");
    }
}
