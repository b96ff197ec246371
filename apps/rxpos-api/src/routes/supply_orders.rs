//! # Supply Order Routes

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

/// `POST /supply_orders?action=receive|mark_ordered|cancel`
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

    let response = match query.action.as_deref() {
        Some("receive") => {
            let Json(body) = body?;
            Json(state.receiving.receive(&actor, parse_body(body)?).await?).into_response()
        }
        Some("mark_ordered") => {
            let Json(body) = body?;
            Json(state.receiving.mark_ordered(&actor, parse_body(body)?).await?).into_response()
        }
        Some("cancel") => {
            let Json(body) = body?;
            Json(state.receiving.cancel(&actor, parse_body(body)?).await?).into_response()
        }
        _ => return Err(query.unknown()),
    };

    Ok(response)
}
