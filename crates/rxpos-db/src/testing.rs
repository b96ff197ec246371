//! Fixtures shared by the repository tests.

use chrono::NaiveDate;
use rxpos_core::Money;

use crate::repository::inventory::NewBatch;
use crate::repository::prescription::{NewPrescription, NewPrescriptionItem};
use crate::repository::supply_order::{NewSupplyOrder, NewSupplyOrderItem};
use crate::{Database, DbConfig};

pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub fn new_batch(batch_number: &str, quantity: i64, price: i64) -> NewBatch {
    NewBatch {
        name: "Paracetamol 500mg".to_string(),
        generic_name: Some("Paracetamol".to_string()),
        category: Some("Analgesic".to_string()),
        batch_number: batch_number.to_string(),
        quantity,
        price: Money::from_minor(price),
        expiry_date: NaiveDate::from_ymd_opt(2028, 12, 31).unwrap(),
        created_by: None,
    }
}

pub fn new_prescription(quantities: &[i64]) -> NewPrescription {
    NewPrescription {
        patient_name: "Jane Doe".to_string(),
        patient_phone: None,
        doctor_name: Some("Dr. Mwangi".to_string()),
        notes: None,
        created_by: Some(1),
        items: quantities
            .iter()
            .enumerate()
            .map(|(i, q)| NewPrescriptionItem {
                medicine_name: format!("Medicine {}", i + 1),
                dosage: None,
                instructions: None,
                quantity_prescribed: *q,
            })
            .collect(),
    }
}

/// `lines` are `(quantity_ordered, unit_cost_minor)`.
pub fn new_supply_order(lines: &[(i64, i64)]) -> NewSupplyOrder {
    NewSupplyOrder {
        supplier_name: "MedSupply Ltd".to_string(),
        notes: None,
        created_by: Some(1),
        items: lines
            .iter()
            .enumerate()
            .map(|(i, (qty, cost))| NewSupplyOrderItem {
                medicine_name: format!("Item {}", i + 1),
                generic_name: None,
                category: None,
                quantity_ordered: *qty,
                unit_cost: Money::from_minor(*cost),
            })
            .collect(),
    }
}
