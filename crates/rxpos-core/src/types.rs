//! # Domain Types
//!
//! Core domain types used throughout Rx POS.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ InventoryBatch  │◄──│   SaleRecord    │   │  AuditLogEntry  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  batch_number   │   │  inventory_id   │   │  action/module  │       │
//! │  │  quantity ≥ 0   │   │  quantity_sold  │   │  details (JSON) │       │
//! │  │  price          │   │  total_revenue  │   │  ip_address     │       │
//! │  └────────▲────────┘   └─────────────────┘   └─────────────────┘       │
//! │           │ inventory_id (set when dispensed / received)               │
//! │  ┌────────┴────────┐   ┌─────────────────┐                              │
//! │  │PrescriptionItem │   │ SupplyOrderItem │                              │
//! │  └────────┬────────┘   └────────┬────────┘                              │
//! │  ┌────────▼────────┐   ┌────────▼────────┐                              │
//! │  │  Prescription   │   │   SupplyOrder   │   status: see lifecycle.rs  │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ids are SQLite row ids (`i64`). Sale records keep a weak reference to the
//! batch plus a denormalized name and batch number, so they stay readable
//! after the batch is exhausted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::lifecycle::{PrescriptionStatus, SupplyOrderStatus};
use crate::money::Money;

// =============================================================================
// Inventory Batch
// =============================================================================

/// One purchased lot of a medicine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryBatch {
    pub id: i64,

    /// Brand or display name.
    pub name: String,

    pub generic_name: Option<String>,

    pub category: Option<String>,

    /// Unique across all batches.
    pub batch_number: String,

    /// Units on hand. Never negative.
    pub quantity: i64,

    /// Unit selling price.
    pub price: Money,

    #[ts(as = "String")]
    pub expiry_date: NaiveDate,

    /// User who created the batch (receiver or manual entry).
    pub created_by: Option<i64>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryBatch {
    /// Checks whether `quantity` units can be taken from this batch.
    pub fn can_supply(&self, quantity: i64) -> bool {
        quantity > 0 && self.quantity >= quantity
    }

    /// Checks whether the batch is past its expiry date on `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }
}

// =============================================================================
// Sale Record
// =============================================================================

/// One line of a completed sale. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleRecord {
    pub id: i64,

    /// Batch the units came from (weak reference).
    pub inventory_id: i64,

    /// Snapshot of the batch number at sale time.
    pub batch_number: String,

    /// Snapshot of the medicine name at sale time.
    pub name: String,

    pub quantity_sold: i64,

    /// Price at sale time × quantity_sold.
    pub total_revenue: Money,

    /// Authenticated user who made the sale.
    pub sold_by: i64,

    pub customer_name: Option<String>,

    /// Free text. Carries the payment tag for checkouts.
    pub notes: Option<String>,

    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid. Recorded as a note tag on each sale line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    MobileMoney,
    Insurance,
}

impl PaymentMethod {
    /// All accepted wire names, in display order.
    pub const ALL: [&'static str; 4] = ["cash", "card", "mobile_money", "insurance"];

    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::Insurance => "insurance",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" | "credit_card" | "debit_card" => Ok(PaymentMethod::Card),
            "mobile_money" | "mobile" => Ok(PaymentMethod::MobileMoney),
            "insurance" => Ok(PaymentMethod::Insurance),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: PaymentMethod::ALL.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Roles and Sessions
// =============================================================================

/// Staff role attached to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Pharmacist,
    Cashier,
}

impl Role {
    /// Counter sales and quick dispensing.
    pub fn can_sell(&self) -> bool {
        matches!(self, Role::Admin | Role::Pharmacist | Role::Cashier)
    }

    /// Prescription verification/dispensing and supply order handling.
    pub fn is_clinical(&self) -> bool {
        matches!(self, Role::Admin | Role::Pharmacist)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Pharmacist => write!(f, "pharmacist"),
            Role::Cashier => write!(f, "cashier"),
        }
    }
}

/// A resolved session: who is calling, as what, until when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Session {
    pub user_id: i64,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Checks whether the session has lapsed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// =============================================================================
// Prescription
// =============================================================================

/// A clinical order awaiting verification and dispensing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Prescription {
    pub id: i64,
    pub patient_name: String,
    pub patient_phone: Option<String>,
    pub doctor_name: Option<String>,
    pub status: PrescriptionStatus,
    pub notes: Option<String>,
    pub created_by: Option<i64>,
    pub verified_by: Option<i64>,
    #[ts(as = "Option<String>")]
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_notes: Option<String>,
    pub dispensed_by: Option<i64>,
    #[ts(as = "Option<String>")]
    pub dispensed_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// One prescribed medicine line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PrescriptionItem {
    pub id: i64,
    pub prescription_id: i64,
    pub medicine_name: String,
    pub dosage: Option<String>,
    pub instructions: Option<String>,
    pub quantity_prescribed: i64,
    /// Set once, at dispensing time.
    pub quantity_dispensed: Option<i64>,
    /// Batch the item was dispensed from.
    pub inventory_id: Option<i64>,
}

impl PrescriptionItem {
    pub fn is_dispensed(&self) -> bool {
        self.quantity_dispensed.is_some()
    }
}

// =============================================================================
// Supply Order
// =============================================================================

/// A purchase order to a supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SupplyOrder {
    pub id: i64,
    pub supplier_name: String,
    pub status: SupplyOrderStatus,
    pub notes: Option<String>,
    pub created_by: Option<i64>,
    pub received_by: Option<i64>,
    #[ts(as = "Option<String>")]
    pub received_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// One ordered medicine line. Receipt fields are filled when the order is received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SupplyOrderItem {
    pub id: i64,
    pub order_id: i64,
    pub medicine_name: String,
    pub generic_name: Option<String>,
    pub category: Option<String>,
    pub quantity_ordered: i64,
    pub unit_cost: Money,
    pub quantity_received: Option<i64>,
    pub batch_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    pub inventory_id: Option<i64>,
}

// =============================================================================
// Audit Log
// =============================================================================

/// Append-only record of who did what, from where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AuditLogEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    /// Action kind, e.g. `sale_completed`.
    pub action: String,
    /// Functional area, e.g. `sales`, `prescriptions`.
    pub module: String,
    pub description: String,
    /// JSON document with operation specifics.
    pub details: Option<String>,
    pub ip_address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn batch(quantity: i64) -> InventoryBatch {
        let now = Utc::now();
        InventoryBatch {
            id: 1,
            name: "Paracetamol 500mg".to_string(),
            generic_name: Some("Paracetamol".to_string()),
            category: Some("Analgesic".to_string()),
            batch_number: "PCM-001".to_string(),
            quantity,
            price: Money::from_minor(1000),
            expiry_date: NaiveDate::from_ymd_opt(2030, 1, 31).unwrap(),
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_can_supply() {
        let b = batch(10);
        assert!(b.can_supply(10));
        assert!(!b.can_supply(11));
        assert!(!b.can_supply(0));
    }

    #[test]
    fn test_is_expired() {
        let b = batch(1);
        assert!(!b.is_expired(NaiveDate::from_ymd_opt(2030, 1, 31).unwrap()));
        assert!(b.is_expired(NaiveDate::from_ymd_opt(2030, 2, 1).unwrap()));
    }

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!(" CARD ".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert_eq!("mobile".parse::<PaymentMethod>().unwrap(), PaymentMethod::MobileMoney);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_payment_method_serialization() {
        let json = serde_json::to_string(&PaymentMethod::MobileMoney).unwrap();
        assert_eq!(json, "\"mobile_money\"");
    }

    #[test]
    fn test_role_permissions() {
        assert!(Role::Cashier.can_sell());
        assert!(!Role::Cashier.is_clinical());
        assert!(Role::Pharmacist.is_clinical());
        assert!(Role::Admin.is_clinical());
    }

    #[test]
    fn test_session_expiry_is_inclusive() {
        let now = Utc::now();
        let session = Session {
            user_id: 3,
            role: Role::Cashier,
            expires_at: now,
        };
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - Duration::seconds(1)));
    }
}
