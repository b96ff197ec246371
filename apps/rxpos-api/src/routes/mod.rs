//! # HTTP Routes
//!
//! | Method | Path                                                | Roles                       |
//! |--------|-----------------------------------------------------|-----------------------------|
//! | POST   | `/sales`                                            | admin, pharmacist, cashier  |
//! | POST   | `/dispense`                                         | admin, pharmacist, cashier  |
//! | POST   | `/prescriptions?action=verify\|dispense`            | admin, pharmacist           |
//! | POST   | `/supply_orders?action=receive\|mark_ordered\|cancel` | admin, pharmacist         |
//! | GET    | `/health`                                           | none                        |
//!
//! Every handler resolves the session and role before reading the body.

pub mod dispense;
pub mod health;
pub mod prescriptions;
pub mod sales;
pub mod supply_orders;

use axum::routing::{get, post};
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sales", post(sales::checkout))
        .route("/dispense", post(dispense::dispense))
        .route("/prescriptions", post(prescriptions::handle))
        .route("/supply_orders", post(supply_orders::handle))
        .route("/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `?action=` selector for multi-action endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ActionQuery {
    pub action: Option<String>,
}

impl ActionQuery {
    fn unknown(&self) -> ApiError {
        match self.action.as_deref() {
            Some(action) => ApiError::bad_request(format!("Unknown action: {}", action)),
            None => ApiError::bad_request("Missing action parameter"),
        }
    }
}

/// Decodes an already-parsed JSON body into the request type of an action.
fn parse_body<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))
}
