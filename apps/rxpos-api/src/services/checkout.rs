//! # Checkout
//!
//! Multi-line counter sale: every line's stock is taken, every line is
//! recorded, or nothing is.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::{finish, take_stock, Actor};
use crate::audit::AuditSink;
use crate::error::ServiceResult;
use rxpos_core::checkout::{payment_note, transaction_reference, CheckoutTotals, PricedLine};
use rxpos_core::validation::{
    normalize_note, validate_cart_line, validate_cart_size, validate_discount,
    validate_payment_method,
};
use rxpos_core::{DiscountRate, Money, PaymentMethod};
use rxpos_db::{Database, NewAuditEntry, NewSaleRecord, UnitOfWork};

// =============================================================================
// Request / Response
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartLineRequest {
    pub inventory_id: Option<i64>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerInfo {
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// Body of `POST /sales`.
///
/// `subtotal` and `total` are what the till displayed, in minor units.
/// They are compared against the server figures and otherwise ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CartLineRequest>,
    pub customer: Option<CustomerInfo>,
    pub payment_method: Option<String>,
    /// Percent, 0..=100.
    pub discount: Option<f64>,
    pub subtotal: Option<f64>,
    pub total: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub inventory_id: i64,
    pub name: String,
    pub batch_number: String,
    pub quantity: i64,
    pub price: Money,
    pub total: Money,
    pub remaining_stock: i64,
}

impl From<PricedLine> for CheckoutLine {
    fn from(line: PricedLine) -> Self {
        CheckoutLine {
            inventory_id: line.inventory_id,
            name: line.name,
            batch_number: line.batch_number,
            quantity: line.quantity,
            price: line.unit_price,
            total: line.line_total,
            remaining_stock: line.remaining_stock,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub transaction_id: String,
    pub items: Vec<CheckoutLine>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

// =============================================================================
// Validated Cart
// =============================================================================

/// A request that passed every check that needs no storage.
#[derive(Debug)]
struct Cart {
    lines: Vec<(i64, i64)>,
    discount: DiscountRate,
    payment_method: PaymentMethod,
    customer_name: Option<String>,
    note: String,
}

impl Cart {
    fn from_request(request: &CheckoutRequest, max_discount: Option<f64>) -> ServiceResult<Self> {
        validate_cart_size(request.items.len())?;

        let lines = request
            .items
            .iter()
            .enumerate()
            .map(|(index, line)| validate_cart_line(index, line.inventory_id, line.quantity))
            .collect::<Result<Vec<_>, _>>()?;

        let discount = validate_discount(request.discount, max_discount)?;
        let payment_method = validate_payment_method(request.payment_method.as_deref())?;

        let customer = request.customer.as_ref();
        let customer_name =
            normalize_note("customer.name", customer.and_then(|c| c.name.as_deref()))?;
        let phone = normalize_note("customer.phone", customer.and_then(|c| c.phone.as_deref()))?;

        Ok(Cart {
            lines,
            discount,
            payment_method,
            customer_name,
            note: payment_note(payment_method, phone.as_deref()),
        })
    }
}

// =============================================================================
// Service
// =============================================================================

/// Processes `POST /sales`.
pub struct CheckoutService {
    db: Database,
    audit: Arc<dyn AuditSink>,
    max_discount_percent: Option<f64>,
}

impl CheckoutService {
    pub fn new(db: Database, audit: Arc<dyn AuditSink>, max_discount_percent: Option<f64>) -> Self {
        CheckoutService {
            db,
            audit,
            max_discount_percent,
        }
    }

    /// Runs one checkout as a single unit of work.
    ///
    /// ## Steps
    /// 1. Validate lines, discount, payment method (no storage touched)
    /// 2. Decrement each batch in request order; the first refusal aborts
    /// 3. Price each line from the batch price read by its decrement
    /// 4. Insert one sale record per line
    /// 5. Commit, then hand the audit entry to the sink
    pub async fn checkout(
        &self,
        actor: &Actor,
        request: CheckoutRequest,
    ) -> ServiceResult<CheckoutResponse> {
        debug!(user_id = actor.user_id, lines = request.items.len(), "checkout");

        let cart = Cart::from_request(&request, self.max_discount_percent)?;
        let now = Utc::now();

        let mut uow = self.db.begin().await?;
        let applied = record_cart(&mut uow, actor, &cart, now).await;
        let (lines, totals, sale_ids) = finish(uow, applied).await?;

        check_client_hints(&request, &totals);

        let transaction_id = transaction_reference(now, actor.user_id);
        info!(
            transaction_id = %transaction_id,
            user_id = actor.user_id,
            lines = lines.len(),
            total = %totals.total,
            payment_method = %cart.payment_method,
            "Checkout completed"
        );

        self.audit.record(
            NewAuditEntry::new(
                Some(actor.user_id),
                "sale_completed",
                "sales",
                format!(
                    "Completed sale {} with {} item(s), total {}",
                    transaction_id,
                    lines.len(),
                    totals.total
                ),
            )
            .with_details(json!({
                "transaction_id": transaction_id,
                "item_count": lines.len(),
                "sale_ids": sale_ids,
                "subtotal": totals.subtotal,
                "discount": totals.discount,
                "discount_percent": cart.discount.as_percentage(),
                "total": totals.total,
                "payment_method": cart.payment_method,
            }))
            .with_ip(actor.ip_address.clone()),
        );

        Ok(CheckoutResponse {
            success: true,
            transaction_id,
            items: lines.into_iter().map(CheckoutLine::from).collect(),
            subtotal: totals.subtotal,
            discount: totals.discount,
            total: totals.total,
        })
    }
}

/// Takes stock for every line, prices the cart, then writes the sale records.
async fn record_cart(
    uow: &mut UnitOfWork,
    actor: &Actor,
    cart: &Cart,
    now: DateTime<Utc>,
) -> ServiceResult<(Vec<PricedLine>, CheckoutTotals, Vec<i64>)> {
    let mut lines = Vec::with_capacity(cart.lines.len());
    for &(inventory_id, quantity) in &cart.lines {
        let batch = take_stock(uow, inventory_id, quantity).await?;
        lines.push(PricedLine::new(
            batch.id,
            batch.name,
            batch.batch_number,
            quantity,
            batch.price,
            batch.quantity,
        )?);
    }
    let totals = CheckoutTotals::compute(&lines, cart.discount)?;

    let mut sale_ids = Vec::with_capacity(lines.len());
    for line in &lines {
        let id = uow
            .sales()
            .insert(&NewSaleRecord {
                inventory_id: line.inventory_id,
                batch_number: line.batch_number.clone(),
                name: line.name.clone(),
                quantity_sold: line.quantity,
                total_revenue: line.line_total,
                sold_by: actor.user_id,
                customer_name: cart.customer_name.clone(),
                notes: Some(cart.note.clone()),
                sale_date: now,
            })
            .await?;
        sale_ids.push(id);
    }

    Ok((lines, totals, sale_ids))
}

fn check_client_hints(request: &CheckoutRequest, totals: &CheckoutTotals) {
    let hints = [
        ("subtotal", request.subtotal, totals.subtotal),
        ("total", request.total, totals.total),
    ];
    for (field, hint, actual) in hints {
        if let Some(hint) = hint {
            if hint.round() as i64 != actual.minor() {
                warn!(field, client = hint, server = actual.minor(), "Client total disagrees");
            }
        }
    }
}
