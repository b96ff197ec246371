//! # Prescription Routes

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

use super::{parse_body, ActionQuery};
use crate::auth::{AuthUser, ClientIp};
use crate::error::ApiError;
use crate::services::Actor;
use crate::AppState;

/// `POST /prescriptions?action=verify|dispense`
pub async fn handle(
    State(state): State<AppState>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    query: Result<Query<ActionQuery>, QueryRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    user.require_clinical()?;
    let Query(query) = query?;
    let actor = Actor::new(user.user_id, ip);

    match query.action.as_deref() {
        Some("verify") => {
            let Json(body) = body?;
            let response = state.prescriptions.verify(&actor, parse_body(body)?).await?;
            Ok(Json(response).into_response())
        }
        Some("dispense") => {
            let Json(body) = body?;
            let response = state
                .prescriptions
                .dispense(&actor, parse_body(body)?)
                .await?;
            Ok(Json(response).into_response())
        }
        _ => Err(query.unknown()),
    }
}
