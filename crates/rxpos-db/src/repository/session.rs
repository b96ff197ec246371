//! # Session Repository
//!
//! Looks up bearer tokens. Sessions are issued by the login service; this
//! crate only reads them, plus the writes that seeding and tests need.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::error::DbResult;
use rxpos_core::{Role, Session};

pub struct SessionRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SessionRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        SessionRepository { conn }
    }

    /// The session behind `token`, if its user is still active.
    ///
    /// Expired sessions are returned too. The caller decides how to report
    /// them.
    pub async fn find_active(&mut self, token: &str) -> DbResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT s.user_id, u.role, s.expires_at
            FROM user_sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = ?1 AND u.is_active = 1
            "#,
        )
        .bind(token)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(session)
    }

    pub async fn create(
        &mut self,
        token: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO user_sessions (token, user_id, expires_at, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Creates a staff account. Returns the user id.
    pub async fn insert_user(&mut self, username: &str, full_name: &str, role: Role) -> DbResult<i64> {
        let result = sqlx::query(
            "INSERT INTO users (username, full_name, role, is_active, created_at) VALUES (?1, ?2, ?3, 1, ?4)",
        )
        .bind(username)
        .bind(full_name)
        .bind(role)
        .bind(Utc::now())
        .execute(&mut *self.conn)
        .await?;

        Ok(result.last_insert_rowid())
    }
}
