//! # Supply Order Receiving
//!
//! The inverse of a sale: goods arrive, batches are created or topped up
//! at cost plus the supply markup, and the order closes.
//!
//! ```text
//! receive      : CAS ordered → received, else CAS pending → received
//!                per line with quantity > 0:
//!                  batch_number = given | "SO{order}-{item}-{yyyymmdd}"
//!                  expiry_date  = given | today + 24 months
//!                  price        = unit_cost × 1.30
//!                  inventory.increment(..), stamp the order line
//! mark_ordered : CAS pending → ordered
//! cancel       : CAS pending|ordered → cancelled
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::{finish, refused, ActionResponse, Actor};
use crate::audit::AuditSink;
use crate::error::{ServiceError, ServiceResult};
use rxpos_core::validation::{
    validate_batch_number, validate_id, validate_received_quantity, validate_unique_ids,
};
use rxpos_core::{
    CoreError, CoreResult, MarkupRate, Money, SupplyOrderStatus, ValidationError,
    DEFAULT_EXPIRY_MONTHS,
};
use rxpos_db::{Database, DbError, ItemReceipt, NewAuditEntry, NewBatch, UnitOfWork};

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReceiveItemRequest {
    pub item_id: Option<i64>,
    pub quantity_received: Option<i64>,
    pub batch_number: Option<String>,
    /// `YYYY-MM-DD`.
    pub expiry_date: Option<NaiveDate>,
}

/// Body of `POST /supply_orders?action=receive`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReceiveRequest {
    pub order_id: Option<i64>,
    #[serde(default)]
    pub items: Vec<ReceiveItemRequest>,
}

/// Body of `mark_ordered` and `cancel`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderActionRequest {
    pub order_id: Option<i64>,
}

/// A batch booked in by a receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivedBatch {
    pub item_id: i64,
    pub inventory_id: i64,
    pub batch_number: String,
    pub quantity: i64,
    pub price: Money,
    pub expiry_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveResponse {
    pub success: bool,
    pub order_id: i64,
    pub batches: Vec<ReceivedBatch>,
}

#[derive(Debug, Clone)]
struct ReceiptLine {
    item_id: i64,
    quantity: i64,
    batch_number: Option<String>,
    expiry_date: Option<NaiveDate>,
}

fn parse_lines(items: &[ReceiveItemRequest]) -> Result<Vec<ReceiptLine>, ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    let lines = items
        .iter()
        .map(|item| {
            let item_id = validate_id("item_id", item.item_id)?;
            let quantity = item.quantity_received.ok_or_else(|| ValidationError::Required {
                field: "quantity_received".to_string(),
            })?;
            validate_received_quantity(quantity)?;

            let batch_number = match item.batch_number.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(given) => {
                    validate_batch_number(given)?;
                    Some(given.to_string())
                }
            };

            Ok(ReceiptLine {
                item_id,
                quantity,
                batch_number,
                expiry_date: item.expiry_date,
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    validate_unique_ids("item_id", lines.iter().map(|l| l.item_id))?;
    Ok(lines)
}

/// Batch number for a line received without one.
pub fn generated_batch_number(order_id: i64, item_id: i64, today: NaiveDate) -> String {
    format!("SO{}-{}-{}", order_id, item_id, today.format("%Y%m%d"))
}

/// Expiry for a line received without one.
pub fn default_expiry(today: NaiveDate) -> Option<NaiveDate> {
    today.checked_add_months(Months::new(DEFAULT_EXPIRY_MONTHS))
}

// =============================================================================
// Service
// =============================================================================

/// Processes supply order lifecycle actions.
pub struct ReceivingService {
    db: Database,
    audit: Arc<dyn AuditSink>,
}

impl ReceivingService {
    pub fn new(db: Database, audit: Arc<dyn AuditSink>) -> Self {
        ReceivingService { db, audit }
    }

    /// Books the listed lines into stock and closes the order.
    ///
    /// Lines with `quantity_received == 0` are recorded but create no
    /// batch. Lines not listed keep an empty receipt.
    pub async fn receive(&self, actor: &Actor, request: ReceiveRequest) -> ServiceResult<ReceiveResponse> {
        let order_id = validate_id("order_id", request.order_id)?;
        let lines = parse_lines(&request.items)?;
        debug!(order_id, lines = lines.len(), user_id = actor.user_id, "receive supply order");

        let now = Utc::now();
        let mut uow = self.db.begin().await?;
        let applied = book_lines(&mut uow, actor, order_id, &lines, now).await;
        let (batches, units) = finish(uow, applied).await?;

        info!(
            order_id,
            batches = batches.len(),
            units,
            user_id = actor.user_id,
            "Supply order received"
        );

        self.audit.record(
            NewAuditEntry::new(
                Some(actor.user_id),
                "supply_order_received",
                "supply_orders",
                format!(
                    "Received supply order {}: {} batch(es), {} unit(s)",
                    order_id,
                    batches.len(),
                    units
                ),
            )
            .with_details(json!({
                "order_id": order_id,
                "batches": batches
                    .iter()
                    .map(|b| json!({
                        "item_id": b.item_id,
                        "inventory_id": b.inventory_id,
                        "batch_number": b.batch_number,
                        "quantity": b.quantity,
                        "price": b.price,
                    }))
                    .collect::<Vec<_>>(),
            }))
            .with_ip(actor.ip_address.clone()),
        );

        Ok(ReceiveResponse {
            success: true,
            order_id,
            batches,
        })
    }

    /// `pending → ordered`.
    pub async fn mark_ordered(
        &self,
        actor: &Actor,
        request: OrderActionRequest,
    ) -> ServiceResult<ActionResponse> {
        let order_id = validate_id("order_id", request.order_id)?;

        let mut uow = self.db.begin().await?;
        let applied = async {
            let moved = uow
                .supply_orders()
                .set_status(
                    order_id,
                    SupplyOrderStatus::Pending,
                    SupplyOrderStatus::Ordered,
                    Utc::now(),
                )
                .await?;
            if !moved {
                return Err(refusal(&mut uow, order_id, |s| s.mark_ordered(order_id)).await);
            }
            Ok::<(), ServiceError>(())
        }
        .await;
        finish(uow, applied).await?;

        info!(order_id, user_id = actor.user_id, "Supply order marked as ordered");
        self.record_transition(
            actor,
            order_id,
            "supply_order_ordered",
            format!("Marked supply order {} as ordered", order_id),
        );

        Ok(ActionResponse::done(format!("Supply order {} ordered", order_id)))
    }

    /// `pending | ordered → cancelled`.
    pub async fn cancel(&self, actor: &Actor, request: OrderActionRequest) -> ServiceResult<ActionResponse> {
        let order_id = validate_id("order_id", request.order_id)?;

        let mut uow = self.db.begin().await?;
        let applied = async {
            let now = Utc::now();
            for from in [SupplyOrderStatus::Pending, SupplyOrderStatus::Ordered] {
                if uow
                    .supply_orders()
                    .set_status(order_id, from, SupplyOrderStatus::Cancelled, now)
                    .await?
                {
                    return Ok(());
                }
            }
            Err::<(), ServiceError>(refusal(&mut uow, order_id, |s| s.cancel(order_id)).await)
        }
        .await;
        finish(uow, applied).await?;

        info!(order_id, user_id = actor.user_id, "Supply order cancelled");
        self.record_transition(
            actor,
            order_id,
            "supply_order_cancelled",
            format!("Cancelled supply order {}", order_id),
        );

        Ok(ActionResponse::done(format!("Supply order {} cancelled", order_id)))
    }

    fn record_transition(&self, actor: &Actor, order_id: i64, action: &str, description: String) {
        self.audit.record(
            NewAuditEntry::new(
                Some(actor.user_id),
                action,
                "supply_orders",
                description,
            )
            .with_details(json!({ "order_id": order_id }))
            .with_ip(actor.ip_address.clone()),
        );
    }
}

/// Why a status compare-and-set on a supply order matched nothing.
async fn refusal(
    uow: &mut UnitOfWork,
    order_id: i64,
    transition: impl FnOnce(SupplyOrderStatus) -> CoreResult<SupplyOrderStatus>,
) -> ServiceError {
    match uow.supply_orders().get(order_id).await {
        Ok(Some(order)) => refused(transition(order.status)),
        Ok(None) => CoreError::SupplyOrderNotFound(order_id).into(),
        Err(e) => e.into(),
    }
}

async fn book_lines(
    uow: &mut UnitOfWork,
    actor: &Actor,
    order_id: i64,
    lines: &[ReceiptLine],
    now: DateTime<Utc>,
) -> ServiceResult<(Vec<ReceivedBatch>, i64)> {
    let mut moved = false;
    for from in [SupplyOrderStatus::Ordered, SupplyOrderStatus::Pending] {
        if uow
            .supply_orders()
            .set_received(order_id, from, actor.user_id, now)
            .await?
        {
            moved = true;
            break;
        }
    }
    if !moved {
        return Err(refusal(uow, order_id, |s| s.receive(order_id)).await);
    }

    let stored: HashMap<i64, _> = uow
        .supply_orders()
        .items(order_id)
        .await?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();

    let today = now.date_naive();
    let mut batches = Vec::new();
    let mut units: i64 = 0;
    for line in lines {
        let item = stored.get(&line.item_id).ok_or(CoreError::SupplyOrderItemNotFound {
            order_id,
            item_id: line.item_id,
        })?;

        let mut receipt = ItemReceipt {
            item_id: item.id,
            order_id,
            quantity_received: line.quantity,
            batch_number: None,
            expiry_date: None,
            inventory_id: None,
        };

        if line.quantity > 0 {
            let batch_number = line
                .batch_number
                .clone()
                .unwrap_or_else(|| generated_batch_number(order_id, item.id, today));
            let expiry_date = match line.expiry_date {
                Some(date) => date,
                None => default_expiry(today).ok_or_else(|| ValidationError::InvalidFormat {
                    field: "expiry_date".to_string(),
                    reason: "default expiry is out of range".to_string(),
                })?,
            };
            let price = item.unit_cost.apply_markup(MarkupRate::SUPPLY)?;

            let batch = uow
                .inventory()
                .increment(&NewBatch {
                    name: item.medicine_name.clone(),
                    generic_name: item.generic_name.clone(),
                    category: item.category.clone(),
                    batch_number: batch_number.clone(),
                    quantity: line.quantity,
                    price,
                    expiry_date,
                    created_by: Some(actor.user_id),
                })
                .await?;

            receipt.batch_number = Some(batch_number.clone());
            receipt.expiry_date = Some(expiry_date);
            receipt.inventory_id = Some(batch.id);

            units = units
                .checked_add(line.quantity)
                .ok_or_else(|| ValidationError::OutOfRange {
                    field: "quantity_received".to_string(),
                    min: 0,
                    max: i64::MAX,
                })?;
            batches.push(ReceivedBatch {
                item_id: item.id,
                inventory_id: batch.id,
                batch_number,
                quantity: line.quantity,
                price: batch.price,
                expiry_date,
            });
        }

        if !uow.supply_orders().record_item_receipt(&receipt).await? {
            return Err(DbError::Internal(format!(
                "supply order item {} already carries a receipt",
                item.id
            ))
            .into());
        }
    }

    Ok((batches, units))
}
