//! SQLite session storage implementation.

use async_trait::async_trait;
use b2clogin_core::auth::{
    AuthError, Result, SessionId, SessionRecord, SessionRepository, WebSession,
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// SQLite-backed session storage. Session data is stored as a JSON column.
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Runs database migrations to create required tables.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS web_sessions (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_web_sessions_expires_at ON web_sessions(expires_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Deletes sessions that expired before `now`. Returns how many were removed.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM web_sessions WHERE expires_at <= ?")
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AuthError::Storage(e.to_string()))
}

#[async_trait]
impl SessionRepository for SqliteSessionStore {
    async fn load_session(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        let row = sqlx::query_as::<_, (String, String, String, String)>(
            "SELECT id, data, created_at, expires_at FROM web_sessions WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Storage(e.to_string()))?;

        match row {
            Some((id, data, created_at, expires_at)) => {
                let data: WebSession =
                    serde_json::from_str(&data).map_err(|e| AuthError::Storage(e.to_string()))?;

                Ok(Some(SessionRecord {
                    id: SessionId::new(id),
                    data,
                    created_at: parse_timestamp(&created_at)?,
                    expires_at: parse_timestamp(&expires_at)?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn save_session(&self, record: &SessionRecord) -> Result<()> {
        let data =
            serde_json::to_string(&record.data).map_err(|e| AuthError::Storage(e.to_string()))?;

        sqlx::query(
            "INSERT INTO web_sessions (id, data, created_at, expires_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET data = excluded.data, expires_at = excluded.expires_at",
        )
        .bind(record.id.as_str())
        .bind(data)
        .bind(record.created_at.to_rfc3339())
        .bind(record.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn delete_session(&self, id: &SessionId) -> Result<()> {
        sqlx::query("DELETE FROM web_sessions WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        Ok(())
    }
}
