//! # API Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CoreError (stock, lifecycle, validation) ──┐                          │
//! │                                             ├──► ServiceError          │
//! │  DbError (storage)  ────────────────────────┘        │                 │
//! │                                                      ▼                 │
//! │  AuthError (missing/expired session, role) ──────► ApiError            │
//! │                                                      │                 │
//! │                                                      ▼                 │
//! │                     { "success": false, "message": "..." } + status    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Source                                   | Status |
//! |------------------------------------------|--------|
//! | `CoreError` (any)                        | 400    |
//! | `DbError::UniqueViolation`               | 400    |
//! | `AuthError::Required` / `Expired`        | 401    |
//! | `AuthError::Forbidden`                   | 403    |
//! | any other `DbError`                      | 500    |

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use rxpos_core::{CoreError, ValidationError};
use rxpos_db::DbError;

/// Failure of a processor call.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request broke a business rule. Nothing was written.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Storage failed. The unit of work was rolled back.
    #[error(transparent)]
    Storage(#[from] DbError),
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Domain(CoreError::Validation(err))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Session and permission failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    Required,

    #[error("Session expired")]
    Expired,

    #[error("Insufficient permissions")]
    Forbidden,
}

/// Error body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

/// An HTTP error response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal() -> Self {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => ApiError::bad_request(e.to_string()),
            ServiceError::Storage(e) if e.is_conflict() => ApiError::bad_request(e.to_string()),
            ServiceError::Storage(e) => {
                error!(error = %e, "Storage failure");
                ApiError::internal()
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = match err {
            AuthError::Required | AuthError::Expired => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
        };
        ApiError::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(format!("Invalid query string: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_are_bad_requests() {
        let err: ApiError = ServiceError::from(CoreError::EmptyCart).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Cart is empty");
    }

    #[test]
    fn test_storage_fault_hides_detail() {
        let err: ApiError =
            ServiceError::from(DbError::QueryFailed("disk I/O error".into())).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn test_duplicate_batch_is_bad_request() {
        let err: ApiError =
            ServiceError::from(DbError::duplicate("inventory.batch_number", "AMX-1")).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_auth_statuses() {
        assert_eq!(ApiError::from(AuthError::Required).status, StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(AuthError::Expired).status, StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(AuthError::Forbidden).status, StatusCode::FORBIDDEN);
    }
}
