//! # Checkout Route

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::auth::{AuthUser, ClientIp};
use crate::error::ApiError;
use crate::services::checkout::{CheckoutRequest, CheckoutResponse};
use crate::services::Actor;
use crate::AppState;

/// `POST /sales`
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    user.require_sales()?;
    let Json(request) = body?;

    let actor = Actor::new(user.user_id, ip);
    let response = state.checkout.checkout(&actor, request).await?;
    Ok(Json(response))
}
