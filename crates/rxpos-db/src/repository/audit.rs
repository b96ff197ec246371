//! # Audit Log Repository
//!
//! Insert-only record of who did what. `details` is arbitrary JSON stored
//! as text.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqliteConnection;

use crate::error::DbResult;
use rxpos_core::AuditLogEntry;

/// An audit entry to append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub user_id: Option<i64>,
    pub action: String,
    pub module: String,
    pub description: String,
    pub details: Option<Value>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewAuditEntry {
    pub fn new(
        user_id: Option<i64>,
        action: impl Into<String>,
        module: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        NewAuditEntry {
            user_id,
            action: action.into(),
            module: module.into(),
            description: description.into(),
            details: None,
            ip_address: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }
}

/// Repository for the audit log, bound to one connection.
pub struct AuditLogRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> AuditLogRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        AuditLogRepository { conn }
    }

    pub async fn append(&mut self, entry: &NewAuditEntry) -> DbResult<i64> {
        let details = entry.details.as_ref().map(Value::to_string);

        let result = sqlx::query(
            r#"
            INSERT INTO audit_logs (
                user_id, action, module, description, details, ip_address, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(entry.user_id)
        .bind(&entry.action)
        .bind(&entry.module)
        .bind(&entry.description)
        .bind(details)
        .bind(&entry.ip_address)
        .bind(entry.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Newest entries first.
    pub async fn recent(&mut self, limit: i64) -> DbResult<Vec<AuditLogEntry>> {
        let entries = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT id, user_id, action, module, description, details, ip_address, created_at
            FROM audit_logs
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(entries)
    }

    pub async fn count(&mut self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_logs")
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }
}
