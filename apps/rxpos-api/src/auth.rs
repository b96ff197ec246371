//! # Session Authentication
//!
//! Bearer tokens are issued by the login service and stored in
//! `user_sessions`. This module only resolves them.
//!
//! ```text
//! Authorization: Bearer <token>
//!        │
//!        ▼
//! AuthUser extractor ── no header / not Bearer ───────────► 401 Authentication required
//!        │
//!        ▼
//! SessionAuthenticator::verify_session(token)
//!        │── None ────────────────────────────────────────► 401 Authentication required
//!        │── Some(session), expires_at <= now ────────────► 401 Session expired
//!        ▼
//! AuthUser { user_id, role }  ── handler role check fails ► 403 Insufficient permissions
//! ```
//!
//! All of this runs before any service opens a unit of work.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use tracing::debug;

use crate::error::{ApiError, AuthError, ServiceError};
use rxpos_core::{Role, Session};
use rxpos_db::{Database, DbError, SessionRepository};

// =============================================================================
// Authenticator
// =============================================================================

/// Resolves a bearer token to a session.
#[async_trait]
pub trait SessionAuthenticator: Send + Sync {
    /// `Ok(None)` for unknown tokens and disabled users. Expired sessions
    /// are returned so the caller can report them distinctly.
    async fn verify_session(&self, token: &str) -> Result<Option<Session>, DbError>;
}

/// Looks tokens up in `user_sessions`.
pub struct DbSessionAuthenticator {
    db: Database,
}

impl DbSessionAuthenticator {
    pub fn new(db: Database) -> Self {
        DbSessionAuthenticator { db }
    }
}

#[async_trait]
impl SessionAuthenticator for DbSessionAuthenticator {
    async fn verify_session(&self, token: &str) -> Result<Option<Session>, DbError> {
        let mut conn = self.db.acquire().await?;
        SessionRepository::new(&mut conn).find_active(token).await
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: Role,
}

impl AuthUser {
    /// Checkout and counter dispensing.
    pub fn require_sales(&self) -> Result<(), AuthError> {
        if self.role.can_sell() {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }

    /// Prescriptions and supply orders.
    pub fn require_clinical(&self) -> Result<(), AuthError> {
        if self.role.is_clinical() {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<dyn SessionAuthenticator>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::Required)?.to_owned();

        let authenticator = Arc::<dyn SessionAuthenticator>::from_ref(state);
        let session = authenticator
            .verify_session(&token)
            .await
            .map_err(ServiceError::from)?
            .ok_or(AuthError::Required)?;

        if session.is_expired(Utc::now()) {
            debug!(user_id = session.user_id, "Rejected expired session");
            return Err(AuthError::Expired.into());
        }

        Ok(AuthUser {
            user_id: session.user_id,
            role: session.role,
        })
    }
}

/// Origin of the request for the audit trail.
///
/// First hop of `X-Forwarded-For`, else the peer address when the server
/// was started with connect info.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIp(pub Option<String>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_owned);

        let peer = || {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        };

        Ok(ClientIp(forwarded.or_else(peer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::Duration;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/sales");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("Bearer   "))), None);
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[test]
    fn test_role_checks() {
        let cashier = AuthUser { user_id: 1, role: Role::Cashier };
        assert!(cashier.require_sales().is_ok());
        assert!(matches!(cashier.require_clinical(), Err(AuthError::Forbidden)));

        let pharmacist = AuthUser { user_id: 2, role: Role::Pharmacist };
        assert!(pharmacist.require_clinical().is_ok());
    }

    #[tokio::test]
    async fn test_db_authenticator() {
        let db = Database::new(rxpos_db::DbConfig::in_memory()).await.unwrap();
        {
            let mut uow = db.begin().await.unwrap();
            let id = uow.sessions().insert_user("amina", "Amina", Role::Admin).await.unwrap();
            uow.sessions()
                .create("live", id, Utc::now() + Duration::hours(1))
                .await
                .unwrap();
            uow.commit().await.unwrap();
        }

        let auth = DbSessionAuthenticator::new(db);
        let session = auth.verify_session("live").await.unwrap().unwrap();
        assert_eq!(session.role, Role::Admin);
        assert!(auth.verify_session("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_client_ip_prefers_forwarded_header() {
        let mut parts = Request::builder()
            .header("x-forwarded-for", "10.1.2.3, 172.16.0.1")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ip.as_deref(), Some("10.1.2.3"));

        let mut bare = Request::builder().body(()).unwrap().into_parts().0;
        let ClientIp(ip) = ClientIp::from_request_parts(&mut bare, &()).await.unwrap();
        assert!(ip.is_none());
    }
}
