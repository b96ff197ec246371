//! # Lifecycle State Machines
//!
//! Guarded transitions for prescriptions and supply orders.
//!
//! ```text
//! Prescription
//! ────────────
//!   pending ──verify(approve)──► verified ──dispense──► dispensed
//!      │
//!      └──────verify(reject)───► rejected
//!
//! Supply order
//! ────────────
//!   pending ──mark_ordered──► ordered ──receive──► received
//!      │                         │
//!      ├────────receive──────────┼───────────────► received
//!      └────────cancel───────────┴──cancel───────► cancelled
//! ```
//!
//! Each transition is a pure function of the current status. The storage
//! layer then applies it as a compare-and-set on the status column, so a
//! concurrent writer that moved the row first makes the update a no-op.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Prescription Status
// =============================================================================

/// Where a prescription is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    /// Awaiting pharmacist review.
    #[default]
    Pending,
    /// Approved, may be dispensed.
    Verified,
    /// Declined. Terminal.
    Rejected,
    /// Medicines handed out. Terminal.
    Dispensed,
}

impl PrescriptionStatus {
    /// Wire and storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrescriptionStatus::Pending => "pending",
            PrescriptionStatus::Verified => "verified",
            PrescriptionStatus::Rejected => "rejected",
            PrescriptionStatus::Dispensed => "dispensed",
        }
    }

    /// Pharmacist review. Legal only from `Pending`.
    pub fn verify(self, id: i64, approve: bool) -> CoreResult<PrescriptionStatus> {
        match self {
            PrescriptionStatus::Pending if approve => Ok(PrescriptionStatus::Verified),
            PrescriptionStatus::Pending => Ok(PrescriptionStatus::Rejected),
            other => Err(other.illegal(id, "verify")),
        }
    }

    /// Hand out the medicines. Legal only from `Verified`.
    pub fn dispense(self, id: i64) -> CoreResult<PrescriptionStatus> {
        match self {
            PrescriptionStatus::Verified => Ok(PrescriptionStatus::Dispensed),
            other => Err(other.illegal(id, "dispense")),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PrescriptionStatus::Rejected | PrescriptionStatus::Dispensed)
    }

    fn illegal(self, id: i64, action: &'static str) -> CoreError {
        CoreError::InvalidTransition {
            entity: "prescription",
            id,
            from: self.to_string(),
            action,
        }
    }
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Supply Order Status
// =============================================================================

/// Where a supply order is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SupplyOrderStatus {
    /// Drafted, not yet sent.
    #[default]
    Pending,
    /// Sent to the supplier.
    Ordered,
    /// Goods booked into inventory. Terminal.
    Received,
    /// Abandoned. Terminal.
    Cancelled,
}

impl SupplyOrderStatus {
    /// Wire and storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplyOrderStatus::Pending => "pending",
            SupplyOrderStatus::Ordered => "ordered",
            SupplyOrderStatus::Received => "received",
            SupplyOrderStatus::Cancelled => "cancelled",
        }
    }

    /// `Pending → Ordered`.
    pub fn mark_ordered(self, id: i64) -> CoreResult<SupplyOrderStatus> {
        match self {
            SupplyOrderStatus::Pending => Ok(SupplyOrderStatus::Ordered),
            other => Err(other.illegal(id, "mark as ordered")),
        }
    }

    /// `Pending | Ordered → Received`. Happens at most once per order.
    pub fn receive(self, id: i64) -> CoreResult<SupplyOrderStatus> {
        match self {
            SupplyOrderStatus::Pending | SupplyOrderStatus::Ordered => {
                Ok(SupplyOrderStatus::Received)
            }
            other => Err(other.illegal(id, "receive")),
        }
    }

    /// `Pending | Ordered → Cancelled`.
    pub fn cancel(self, id: i64) -> CoreResult<SupplyOrderStatus> {
        match self {
            SupplyOrderStatus::Pending | SupplyOrderStatus::Ordered => {
                Ok(SupplyOrderStatus::Cancelled)
            }
            other => Err(other.illegal(id, "cancel")),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SupplyOrderStatus::Received | SupplyOrderStatus::Cancelled)
    }

    fn illegal(self, id: i64, action: &'static str) -> CoreError {
        CoreError::InvalidTransition {
            entity: "supply order",
            id,
            from: self.to_string(),
            action,
        }
    }
}

impl fmt::Display for SupplyOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_from_pending() {
        assert_eq!(
            PrescriptionStatus::Pending.verify(1, true).unwrap(),
            PrescriptionStatus::Verified
        );
        assert_eq!(
            PrescriptionStatus::Pending.verify(1, false).unwrap(),
            PrescriptionStatus::Rejected
        );
    }

    #[test]
    fn test_verify_rejects_non_pending() {
        for status in [
            PrescriptionStatus::Verified,
            PrescriptionStatus::Rejected,
            PrescriptionStatus::Dispensed,
        ] {
            let err = status.verify(9, true).unwrap_err();
            assert!(matches!(err, CoreError::InvalidTransition { action: "verify", .. }));
        }
    }

    #[test]
    fn test_dispense_only_from_verified() {
        assert_eq!(
            PrescriptionStatus::Verified.dispense(1).unwrap(),
            PrescriptionStatus::Dispensed
        );
        let err = PrescriptionStatus::Pending.dispense(4).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot dispense prescription 4: current status is pending"
        );
        assert!(PrescriptionStatus::Dispensed.dispense(4).is_err());
        assert!(PrescriptionStatus::Rejected.dispense(4).is_err());
    }

    #[test]
    fn test_supply_order_receive_once() {
        let received = SupplyOrderStatus::Ordered.receive(2).unwrap();
        assert_eq!(received, SupplyOrderStatus::Received);
        assert!(received.receive(2).is_err());
        assert!(SupplyOrderStatus::Pending.receive(2).is_ok());
    }

    #[test]
    fn test_supply_order_cancel() {
        assert_eq!(
            SupplyOrderStatus::Pending.cancel(1).unwrap(),
            SupplyOrderStatus::Cancelled
        );
        assert!(SupplyOrderStatus::Cancelled.receive(1).is_err());
        assert!(SupplyOrderStatus::Received.cancel(1).is_err());
        assert!(SupplyOrderStatus::Ordered.mark_ordered(1).is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(PrescriptionStatus::Dispensed.is_terminal());
        assert!(!PrescriptionStatus::Verified.is_terminal());
        assert!(SupplyOrderStatus::Cancelled.is_terminal());
        assert!(!SupplyOrderStatus::Ordered.is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&PrescriptionStatus::Verified).unwrap(),
            "\"verified\""
        );
        assert_eq!(
            serde_json::from_str::<SupplyOrderStatus>("\"cancelled\"").unwrap(),
            SupplyOrderStatus::Cancelled
        );
    }
}
