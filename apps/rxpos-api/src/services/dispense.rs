//! # Counter Dispense
//!
//! Single batch, single quantity, no discount. The quick path for the
//! counter when a full cart is overkill.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::{finish, take_stock, Actor};
use crate::audit::AuditSink;
use crate::error::{ServiceError, ServiceResult};
use rxpos_core::validation::{normalize_note, validate_id, validate_quantity};
use rxpos_core::{Money, ValidationError};
use rxpos_db::{Database, NewAuditEntry, NewSaleRecord};

/// Body of `POST /dispense`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispenseRequest {
    pub inventory_id: Option<i64>,
    pub qty: Option<i64>,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispenseResponse {
    pub success: bool,
    pub sale_id: i64,
    pub quantity_dispensed: i64,
    pub total_revenue: Money,
    pub remaining_stock: i64,
}

/// Processes `POST /dispense`.
pub struct DispenseService {
    db: Database,
    audit: Arc<dyn AuditSink>,
}

impl DispenseService {
    pub fn new(db: Database, audit: Arc<dyn AuditSink>) -> Self {
        DispenseService { db, audit }
    }

    pub async fn dispense(
        &self,
        actor: &Actor,
        request: DispenseRequest,
    ) -> ServiceResult<DispenseResponse> {
        debug!(user_id = actor.user_id, inventory_id = ?request.inventory_id, "dispense");

        let inventory_id = validate_id("inventory_id", request.inventory_id)?;
        let qty = request.qty.ok_or_else(|| ValidationError::Required {
            field: "qty".to_string(),
        })?;
        validate_quantity(qty)?;
        let customer_name = normalize_note("customer_name", request.customer_name.as_deref())?;
        let notes = normalize_note("notes", request.notes.as_deref())?;

        let mut uow = self.db.begin().await?;
        let applied = async {
            let batch = take_stock(&mut uow, inventory_id, qty).await?;
            let revenue = batch.price.multiply_quantity(qty)?;
            let sale_id = uow
                .sales()
                .insert(&NewSaleRecord {
                    inventory_id: batch.id,
                    batch_number: batch.batch_number.clone(),
                    name: batch.name.clone(),
                    quantity_sold: qty,
                    total_revenue: revenue,
                    sold_by: actor.user_id,
                    customer_name,
                    notes,
                    sale_date: Utc::now(),
                })
                .await?;
            Ok::<_, ServiceError>((batch, revenue, sale_id))
        }
        .await;
        let (batch, revenue, sale_id) = finish(uow, applied).await?;

        info!(
            sale_id,
            batch_id = batch.id,
            quantity = qty,
            revenue = %revenue,
            remaining = batch.quantity,
            "Medicine dispensed"
        );

        self.audit.record(
            NewAuditEntry::new(
                Some(actor.user_id),
                "medicine_dispensed",
                "dispense",
                format!("Dispensed {} x {} (batch {})", qty, batch.name, batch.batch_number),
            )
            .with_details(json!({
                "sale_id": sale_id,
                "inventory_id": batch.id,
                "quantity": qty,
                "total_revenue": revenue,
                "remaining_stock": batch.quantity,
            }))
            .with_ip(actor.ip_address.clone()),
        );

        Ok(DispenseResponse {
            success: true,
            sale_id,
            quantity_dispensed: qty,
            total_revenue: revenue,
            remaining_stock: batch.quantity,
        })
    }
}
