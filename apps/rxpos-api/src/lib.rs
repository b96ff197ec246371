//! # Rx POS API
//!
//! HTTP surface of the pharmacy transaction core: checkout, counter
//! dispensing, prescription verification and dispensing, and supply
//! order receiving.
//!
//! ## Modules
//!
//! - [`auth`]: bearer session resolution and role checks
//! - [`services`]: the four transaction services
//! - [`routes`]: axum handlers and the router
//! - [`audit`]: background audit trail writer
//! - [`config`]: TOML + environment configuration
//! - [`error`]: error types and HTTP mapping

pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::extract::FromRef;

use audit::AuditSink;
use auth::SessionAuthenticator;
use rxpos_db::Database;
use services::{CheckoutService, DispenseService, PrescriptionService, ReceivingService};

pub use routes::router;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub authenticator: Arc<dyn SessionAuthenticator>,
    pub checkout: Arc<CheckoutService>,
    pub dispense: Arc<DispenseService>,
    pub prescriptions: Arc<PrescriptionService>,
    pub receiving: Arc<ReceivingService>,
}

impl AppState {
    pub fn new(
        db: Database,
        audit: Arc<dyn AuditSink>,
        authenticator: Arc<dyn SessionAuthenticator>,
        max_discount_percent: Option<f64>,
    ) -> Self {
        AppState {
            checkout: Arc::new(CheckoutService::new(
                db.clone(),
                audit.clone(),
                max_discount_percent,
            )),
            dispense: Arc::new(DispenseService::new(db.clone(), audit.clone())),
            prescriptions: Arc::new(PrescriptionService::new(db.clone(), audit.clone())),
            receiving: Arc::new(ReceivingService::new(db.clone(), audit)),
            authenticator,
            db,
        }
    }
}

impl FromRef<AppState> for Arc<dyn SessionAuthenticator> {
    fn from_ref(state: &AppState) -> Self {
        state.authenticator.clone()
    }
}
