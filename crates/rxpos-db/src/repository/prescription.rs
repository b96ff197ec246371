//! # Prescription Repository
//!
//! Prescriptions, their items, and the guarded status writes.
//!
//! Every status write is a compare-and-set:
//! ```sql
//! UPDATE prescriptions SET status = ?to, ... WHERE id = ?id AND status = ?from
//! ```
//! `false` means someone else moved the row first. The caller turns that
//! into a transition error and rolls back.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use rxpos_core::{Prescription, PrescriptionItem, PrescriptionStatus};

/// A prescription to insert, items included.
#[derive(Debug, Clone)]
pub struct NewPrescription {
    pub patient_name: String,
    pub patient_phone: Option<String>,
    pub doctor_name: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<i64>,
    pub items: Vec<NewPrescriptionItem>,
}

#[derive(Debug, Clone)]
pub struct NewPrescriptionItem {
    pub medicine_name: String,
    pub dosage: Option<String>,
    pub instructions: Option<String>,
    pub quantity_prescribed: i64,
}

/// Repository for prescriptions, bound to one connection.
pub struct PrescriptionRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> PrescriptionRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        PrescriptionRepository { conn }
    }

    /// Inserts a pending prescription and its items. Returns the new id.
    pub async fn insert(&mut self, rx: &NewPrescription) -> DbResult<i64> {
        let now = Utc::now();

        let id = sqlx::query(
            r#"
            INSERT INTO prescriptions (
                patient_name, patient_phone, doctor_name, status,
                notes, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
        )
        .bind(&rx.patient_name)
        .bind(&rx.patient_phone)
        .bind(&rx.doctor_name)
        .bind(PrescriptionStatus::Pending)
        .bind(&rx.notes)
        .bind(rx.created_by)
        .bind(now)
        .execute(&mut *self.conn)
        .await?
        .last_insert_rowid();

        for item in &rx.items {
            sqlx::query(
                r#"
                INSERT INTO prescription_items (
                    prescription_id, medicine_name, dosage,
                    instructions, quantity_prescribed
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(id)
            .bind(&item.medicine_name)
            .bind(&item.dosage)
            .bind(&item.instructions)
            .bind(item.quantity_prescribed)
            .execute(&mut *self.conn)
            .await?;
        }

        debug!(prescription_id = id, items = rx.items.len(), "Prescription created");
        Ok(id)
    }

    /// Gets a prescription by id.
    pub async fn get(&mut self, id: i64) -> DbResult<Option<Prescription>> {
        let rx = sqlx::query_as::<_, Prescription>(
            r#"
            SELECT
                id, patient_name, patient_phone, doctor_name, status, notes,
                created_by, verified_by, verified_at, verification_notes,
                dispensed_by, dispensed_at, created_at, updated_at
            FROM prescriptions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(rx)
    }

    /// Items of a prescription, in insertion order.
    pub async fn items(&mut self, prescription_id: i64) -> DbResult<Vec<PrescriptionItem>> {
        let items = sqlx::query_as::<_, PrescriptionItem>(
            r#"
            SELECT
                id, prescription_id, medicine_name, dosage, instructions,
                quantity_prescribed, quantity_dispensed, inventory_id
            FROM prescription_items
            WHERE prescription_id = ?1
            ORDER BY id
            "#,
        )
        .bind(prescription_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(items)
    }

    /// Records the pharmacist's decision if the status is still `from`.
    pub async fn set_verification(
        &mut self,
        id: i64,
        from: PrescriptionStatus,
        to: PrescriptionStatus,
        verifier: i64,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE prescriptions
            SET status = ?3,
                verified_by = ?4,
                verified_at = ?5,
                verification_notes = ?6,
                updated_at = ?5
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(verifier)
        .bind(at)
        .bind(notes)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Marks the prescription dispensed if the status is still `from`.
    pub async fn set_dispensed(
        &mut self,
        id: i64,
        from: PrescriptionStatus,
        dispenser: i64,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE prescriptions
            SET status = ?3,
                dispensed_by = ?4,
                dispensed_at = ?5,
                updated_at = ?5
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(PrescriptionStatus::Dispensed)
        .bind(dispenser)
        .bind(at)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Records what was handed out for one item.
    ///
    /// Only an item of this prescription with no dispensed quantity yet is
    /// touched. Returns `false` otherwise.
    pub async fn mark_item_dispensed(
        &mut self,
        item_id: i64,
        prescription_id: i64,
        qty: i64,
        inventory_id: i64,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE prescription_items
            SET quantity_dispensed = ?3,
                inventory_id = ?4
            WHERE id = ?1
              AND prescription_id = ?2
              AND quantity_dispensed IS NULL
            "#,
        )
        .bind(item_id)
        .bind(prescription_id)
        .bind(qty)
        .bind(inventory_id)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
