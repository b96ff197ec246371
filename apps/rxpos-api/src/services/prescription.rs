//! # Prescription Processing
//!
//! ```text
//! verify   : CAS pending → verified|rejected
//! dispense : CAS verified → dispensed
//!            ├── every stored item covered exactly once, qty ≤ prescribed
//!            ├── per line: decrement batch, insert sale, stamp item
//!            └── any failure: rollback, status stays verified
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::{finish, refused, take_stock, ActionResponse, Actor};
use crate::audit::AuditSink;
use crate::error::{ServiceError, ServiceResult};
use rxpos_core::validation::{
    normalize_note, validate_dispensed_quantity, validate_id, validate_unique_ids,
};
use rxpos_core::{CoreError, CoreResult, Money, PrescriptionStatus, ValidationError};
use rxpos_db::{Database, NewAuditEntry, NewSaleRecord, UnitOfWork};

/// Sale note on every line of a prescription dispense.
pub const PRESCRIPTION_SALE_NOTE: &str = "Prescription dispensing";

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /prescriptions?action=verify`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyRequest {
    pub prescription_id: Option<i64>,
    /// `verified` (or `approved`) or `rejected`.
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispenseItemRequest {
    pub item_id: Option<i64>,
    pub inventory_id: Option<i64>,
    pub quantity_dispensed: Option<i64>,
}

/// Body of `POST /prescriptions?action=dispense`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrescriptionDispenseRequest {
    pub prescription_id: Option<i64>,
    #[serde(default)]
    pub items: Vec<DispenseItemRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionDispenseResponse {
    pub success: bool,
    pub prescription_id: i64,
    pub sale_ids: Vec<i64>,
    pub total_revenue: Money,
}

fn parse_decision(status: Option<&str>) -> Result<bool, ValidationError> {
    match status.map(|s| s.trim().to_lowercase()).as_deref() {
        None | Some("") => Err(ValidationError::Required {
            field: "status".to_string(),
        }),
        Some("verified") | Some("approved") => Ok(true),
        Some("rejected") => Ok(false),
        Some(_) => Err(ValidationError::NotAllowed {
            field: "status".to_string(),
            allowed: vec!["verified".to_string(), "rejected".to_string()],
        }),
    }
}

/// A dispense line after shape checks.
#[derive(Debug, Clone, Copy)]
struct DispenseLine {
    item_id: i64,
    inventory_id: i64,
    quantity: i64,
}

fn parse_lines(items: &[DispenseItemRequest]) -> ServiceResult<Vec<DispenseLine>> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        }
        .into());
    }

    let lines = items
        .iter()
        .map(|item| {
            let quantity = item.quantity_dispensed.ok_or_else(|| ValidationError::Required {
                field: "quantity_dispensed".to_string(),
            })?;
            Ok(DispenseLine {
                item_id: validate_id("item_id", item.item_id)?,
                inventory_id: validate_id("inventory_id", item.inventory_id)?,
                quantity,
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    validate_unique_ids("item_id", lines.iter().map(|l| l.item_id))?;
    Ok(lines)
}

// =============================================================================
// Service
// =============================================================================

/// Processes prescription verification and dispensing.
pub struct PrescriptionService {
    db: Database,
    audit: Arc<dyn AuditSink>,
}

impl PrescriptionService {
    pub fn new(db: Database, audit: Arc<dyn AuditSink>) -> Self {
        PrescriptionService { db, audit }
    }

    /// Records the pharmacist's decision on a pending prescription.
    pub async fn verify(&self, actor: &Actor, request: VerifyRequest) -> ServiceResult<ActionResponse> {
        let id = validate_id("prescription_id", request.prescription_id)?;
        let approve = parse_decision(request.status.as_deref())?;
        let notes = normalize_note("notes", request.notes.as_deref())?;
        debug!(prescription_id = id, approve, user_id = actor.user_id, "verify prescription");

        let target = PrescriptionStatus::Pending.verify(id, approve)?;
        let now = Utc::now();

        let mut uow = self.db.begin().await?;
        let applied = async {
            let moved = uow
                .prescriptions()
                .set_verification(
                    id,
                    PrescriptionStatus::Pending,
                    target,
                    actor.user_id,
                    notes.as_deref(),
                    now,
                )
                .await?;
            if !moved {
                return Err(refusal(&mut uow, id, |s| s.verify(id, approve)).await);
            }
            Ok::<(), ServiceError>(())
        }
        .await;
        finish(uow, applied).await?;

        info!(prescription_id = id, status = %target, user_id = actor.user_id, "Prescription verified");

        let (action, verb) = if approve {
            ("prescription_verified", "Verified")
        } else {
            ("prescription_rejected", "Rejected")
        };
        self.audit.record(
            NewAuditEntry::new(
                Some(actor.user_id),
                action,
                "prescriptions",
                format!("{} prescription {}", verb, id),
            )
            .with_details(json!({
                "prescription_id": id,
                "status": target,
                "notes": notes,
            }))
            .with_ip(actor.ip_address.clone()),
        );

        Ok(ActionResponse::done(format!("Prescription {} {}", id, target)))
    }

    /// Dispenses every item of a verified prescription, or none of them.
    pub async fn dispense(
        &self,
        actor: &Actor,
        request: PrescriptionDispenseRequest,
    ) -> ServiceResult<PrescriptionDispenseResponse> {
        let id = validate_id("prescription_id", request.prescription_id)?;
        let lines = parse_lines(&request.items)?;
        debug!(prescription_id = id, lines = lines.len(), user_id = actor.user_id, "dispense prescription");

        let now = Utc::now();
        let mut uow = self.db.begin().await?;
        let applied = dispense_lines(&mut uow, actor, id, &lines, now).await;
        let (patient_name, sale_ids, total_revenue) = finish(uow, applied).await?;

        info!(
            prescription_id = id,
            lines = sale_ids.len(),
            revenue = %total_revenue,
            user_id = actor.user_id,
            "Prescription dispensed"
        );

        self.audit.record(
            NewAuditEntry::new(
                Some(actor.user_id),
                "prescription_dispensed",
                "prescriptions",
                format!(
                    "Dispensed prescription {} for {} ({} item(s))",
                    id,
                    patient_name,
                    sale_ids.len()
                ),
            )
            .with_details(json!({
                "prescription_id": id,
                "sale_ids": sale_ids,
                "total_revenue": total_revenue,
            }))
            .with_ip(actor.ip_address.clone()),
        );

        Ok(PrescriptionDispenseResponse {
            success: true,
            prescription_id: id,
            sale_ids,
            total_revenue,
        })
    }
}

/// Why a status compare-and-set on a prescription matched nothing.
async fn refusal(
    uow: &mut UnitOfWork,
    id: i64,
    transition: impl FnOnce(PrescriptionStatus) -> CoreResult<PrescriptionStatus>,
) -> ServiceError {
    match uow.prescriptions().get(id).await {
        Ok(Some(rx)) => refused(transition(rx.status)),
        Ok(None) => CoreError::PrescriptionNotFound(id).into(),
        Err(e) => e.into(),
    }
}

async fn dispense_lines(
    uow: &mut UnitOfWork,
    actor: &Actor,
    id: i64,
    lines: &[DispenseLine],
    now: DateTime<Utc>,
) -> ServiceResult<(String, Vec<i64>, Money)> {
    let moved = uow
        .prescriptions()
        .set_dispensed(id, PrescriptionStatus::Verified, actor.user_id, now)
        .await?;
    if !moved {
        return Err(refusal(uow, id, |s| s.dispense(id)).await);
    }

    let rx = uow
        .prescriptions()
        .get(id)
        .await?
        .ok_or(CoreError::PrescriptionNotFound(id))?;
    let stored = uow.prescriptions().items(id).await?;

    let requested: HashMap<i64, &DispenseLine> = lines.iter().map(|l| (l.item_id, l)).collect();
    if let Some(stray) = lines.iter().find(|l| !stored.iter().any(|s| s.id == l.item_id)) {
        return Err(CoreError::PrescriptionItemNotFound {
            prescription_id: id,
            item_id: stray.item_id,
        }
        .into());
    }
    for item in &stored {
        if item.is_dispensed() {
            return Err(CoreError::ItemAlreadyDispensed { item_id: item.id }.into());
        }
        let line = requested.get(&item.id).ok_or_else(|| ValidationError::Required {
            field: format!("dispense line for item {}", item.id),
        })?;
        validate_dispensed_quantity(line.quantity, item.quantity_prescribed)?;
    }

    let mut sale_ids = Vec::with_capacity(lines.len());
    let mut total_revenue = Money::zero();
    for line in lines {
        let batch = take_stock(uow, line.inventory_id, line.quantity).await?;
        let revenue = batch.price.multiply_quantity(line.quantity)?;

        let sale_id = uow
            .sales()
            .insert(&NewSaleRecord {
                inventory_id: batch.id,
                batch_number: batch.batch_number,
                name: batch.name,
                quantity_sold: line.quantity,
                total_revenue: revenue,
                sold_by: actor.user_id,
                customer_name: Some(rx.patient_name.clone()),
                notes: Some(PRESCRIPTION_SALE_NOTE.to_string()),
                sale_date: now,
            })
            .await?;

        let stamped = uow
            .prescriptions()
            .mark_item_dispensed(line.item_id, id, line.quantity, batch.id)
            .await?;
        if !stamped {
            return Err(CoreError::ItemAlreadyDispensed {
                item_id: line.item_id,
            }
            .into());
        }

        sale_ids.push(sale_id);
        total_revenue = total_revenue.checked_add(revenue)?;
    }

    Ok((rx.patient_name, sale_ids, total_revenue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{
        batch_quantity, sale_count, seed_batch, seed_prescription, sink, test_db,
    };

    fn pharmacist() -> Actor {
        Actor::new(2, Some("192.168.1.20".to_string()))
    }

    fn verify_request(id: i64, status: &str) -> VerifyRequest {
        VerifyRequest {
            prescription_id: Some(id),
            status: Some(status.to_string()),
            notes: Some("Dose checked".to_string()),
        }
    }

    fn item(item_id: i64, inventory_id: i64, qty: i64) -> DispenseItemRequest {
        DispenseItemRequest {
            item_id: Some(item_id),
            inventory_id: Some(inventory_id),
            quantity_dispensed: Some(qty),
        }
    }

    async fn status_of(db: &Database, id: i64) -> PrescriptionStatus {
        let mut uow = db.begin().await.unwrap();
        uow.prescriptions().get(id).await.unwrap().unwrap().status
    }

    async fn verified_prescription(db: &Database, quantities: &[i64]) -> (i64, Vec<i64>) {
        let (id, items) = seed_prescription(db, quantities).await;
        PrescriptionService::new(db.clone(), sink())
            .verify(&pharmacist(), verify_request(id, "verified"))
            .await
            .unwrap();
        (id, items)
    }

    #[tokio::test]
    async fn test_verify_and_reject() {
        let db = test_db().await;
        let audit = sink();
        let service = PrescriptionService::new(db.clone(), audit.clone());

        let (approved, _) = seed_prescription(&db, &[10]).await;
        service
            .verify(&pharmacist(), verify_request(approved, "approved"))
            .await
            .unwrap();
        assert_eq!(status_of(&db, approved).await, PrescriptionStatus::Verified);

        let (declined, _) = seed_prescription(&db, &[10]).await;
        service
            .verify(&pharmacist(), verify_request(declined, "rejected"))
            .await
            .unwrap();
        assert_eq!(status_of(&db, declined).await, PrescriptionStatus::Rejected);

        let mut uow = db.begin().await.unwrap();
        let rx = uow.prescriptions().get(approved).await.unwrap().unwrap();
        assert_eq!(rx.verified_by, Some(2));
        assert_eq!(rx.verification_notes.as_deref(), Some("Dose checked"));
        drop(uow);

        assert_eq!(
            audit.actions(),
            vec!["prescription_verified", "prescription_rejected"]
        );
    }

    #[tokio::test]
    async fn test_verify_twice_is_illegal() {
        let db = test_db().await;
        let (id, _) = verified_prescription(&db, &[5]).await;
        let service = PrescriptionService::new(db.clone(), sink());

        let err = service
            .verify(&pharmacist(), verify_request(id, "rejected"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(CoreError::InvalidTransition { action: "verify", .. })
        ));
        assert_eq!(status_of(&db, id).await, PrescriptionStatus::Verified);
    }

    #[tokio::test]
    async fn test_verify_unknown_and_bad_status() {
        let db = test_db().await;
        let service = PrescriptionService::new(db.clone(), sink());

        let err = service
            .verify(&pharmacist(), verify_request(77, "verified"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(CoreError::PrescriptionNotFound(77))));

        let err = service
            .verify(&pharmacist(), verify_request(1, "maybe"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("status must be one of"));
    }

    #[tokio::test]
    async fn test_dispense_whole_prescription() {
        let db = test_db().await;
        let a = seed_batch(&db, "AMX-10", 30, 500).await;
        let b = seed_batch(&db, "IBU-10", 30, 200).await;
        let (id, items) = verified_prescription(&db, &[10, 20]).await;
        let audit = sink();
        let service = PrescriptionService::new(db.clone(), audit.clone());

        let response = service
            .dispense(
                &pharmacist(),
                PrescriptionDispenseRequest {
                    prescription_id: Some(id),
                    items: vec![item(items[0], a, 10), item(items[1], b, 15)],
                },
            )
            .await
            .unwrap();

        assert_eq!(response.sale_ids.len(), 2);
        assert_eq!(response.total_revenue.minor(), 10 * 500 + 15 * 200);
        assert_eq!(status_of(&db, id).await, PrescriptionStatus::Dispensed);
        assert_eq!(batch_quantity(&db, a).await, 20);
        assert_eq!(batch_quantity(&db, b).await, 15);

        let mut uow = db.begin().await.unwrap();
        let stored = uow.prescriptions().items(id).await.unwrap();
        assert_eq!(stored[0].quantity_dispensed, Some(10));
        assert_eq!(stored[0].inventory_id, Some(a));
        assert_eq!(stored[1].quantity_dispensed, Some(15));

        let sale = uow.sales().get(response.sale_ids[0]).await.unwrap().unwrap();
        assert_eq!(sale.customer_name.as_deref(), Some("Grace Njeri"));
        assert_eq!(sale.notes.as_deref(), Some(PRESCRIPTION_SALE_NOTE));
        drop(uow);

        assert_eq!(audit.actions(), vec!["prescription_dispensed"]);
    }

    #[tokio::test]
    async fn test_one_short_line_fails_whole_prescription() {
        let db = test_db().await;
        let plenty = seed_batch(&db, "OK-10", 50, 100).await;
        let scarce = seed_batch(&db, "LOW-10", 2, 100).await;
        let (id, items) = verified_prescription(&db, &[5, 5]).await;
        let service = PrescriptionService::new(db.clone(), sink());

        let err = service
            .dispense(
                &pharmacist(),
                PrescriptionDispenseRequest {
                    prescription_id: Some(id),
                    items: vec![item(items[0], plenty, 5), item(items[1], scarce, 5)],
                },
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("available: 2"));
        assert_eq!(status_of(&db, id).await, PrescriptionStatus::Verified);
        assert_eq!(batch_quantity(&db, plenty).await, 50);
        assert_eq!(sale_count(&db).await, 0);

        let mut uow = db.begin().await.unwrap();
        let stored = uow.prescriptions().items(id).await.unwrap();
        assert!(stored.iter().all(|i| i.quantity_dispensed.is_none()));
    }

    #[tokio::test]
    async fn test_dispense_requires_verified() {
        let db = test_db().await;
        let batch = seed_batch(&db, "PEND-10", 50, 100).await;
        let (id, items) = seed_prescription(&db, &[5]).await;
        let service = PrescriptionService::new(db.clone(), sink());

        let err = service
            .dispense(
                &pharmacist(),
                PrescriptionDispenseRequest {
                    prescription_id: Some(id),
                    items: vec![item(items[0], batch, 5)],
                },
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            format!("Cannot dispense prescription {id}: current status is pending")
        );
        assert_eq!(batch_quantity(&db, batch).await, 50);
    }

    #[tokio::test]
    async fn test_dispense_twice_is_illegal() {
        let db = test_db().await;
        let batch = seed_batch(&db, "TWICE-10", 50, 100).await;
        let (id, items) = verified_prescription(&db, &[5]).await;
        let service = PrescriptionService::new(db.clone(), sink());
        let request = || PrescriptionDispenseRequest {
            prescription_id: Some(id),
            items: vec![item(items[0], batch, 5)],
        };

        service.dispense(&pharmacist(), request()).await.unwrap();
        let err = service.dispense(&pharmacist(), request()).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Domain(CoreError::InvalidTransition { action: "dispense", .. })
        ));
        assert_eq!(batch_quantity(&db, batch).await, 45);
    }

    #[tokio::test]
    async fn test_dispense_coverage_rules() {
        let db = test_db().await;
        let batch = seed_batch(&db, "COV-10", 100, 100).await;
        let (id, items) = verified_prescription(&db, &[5, 5]).await;
        let service = PrescriptionService::new(db.clone(), sink());
        let attempt = |lines: Vec<DispenseItemRequest>| PrescriptionDispenseRequest {
            prescription_id: Some(id),
            items: lines,
        };

        let missing = service
            .dispense(&pharmacist(), attempt(vec![item(items[0], batch, 5)]))
            .await
            .unwrap_err();
        assert!(missing.to_string().contains(&format!("item {}", items[1])));

        let over = service
            .dispense(
                &pharmacist(),
                attempt(vec![item(items[0], batch, 6), item(items[1], batch, 5)]),
            )
            .await
            .unwrap_err();
        assert!(over.to_string().contains("quantity_dispensed"));

        let stray = service
            .dispense(
                &pharmacist(),
                attempt(vec![
                    item(items[0], batch, 5),
                    item(items[1], batch, 5),
                    item(9999, batch, 1),
                ]),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            stray,
            ServiceError::Domain(CoreError::PrescriptionItemNotFound { item_id: 9999, .. })
        ));

        let duplicate = service
            .dispense(
                &pharmacist(),
                attempt(vec![item(items[0], batch, 5), item(items[0], batch, 5)]),
            )
            .await
            .unwrap_err();
        assert!(duplicate.to_string().contains("more than once"));

        assert_eq!(status_of(&db, id).await, PrescriptionStatus::Verified);
        assert_eq!(batch_quantity(&db, batch).await, 100);
    }
}
