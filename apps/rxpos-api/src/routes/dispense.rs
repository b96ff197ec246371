//! # Counter Dispense Route

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::auth::{AuthUser, ClientIp};
use crate::error::ApiError;
use crate::services::dispense::{DispenseRequest, DispenseResponse};
use crate::services::Actor;
use crate::AppState;

/// `POST /dispense`
pub async fn dispense(
    State(state): State<AppState>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    body: Result<Json<DispenseRequest>, JsonRejection>,
) -> Result<Json<DispenseResponse>, ApiError> {
    user.require_sales()?;
    let Json(request) = body?;

    let actor = Actor::new(user.user_id, ip);
    let response = state.dispense.dispense(&actor, request).await?;
    Ok(Json(response))
}
