//! Redis session storage implementation.

use async_trait::async_trait;
use b2clogin_core::auth::{AuthError, Result, SessionId, SessionRecord, SessionRepository};
use chrono::Utc;
use fred::prelude::*;

/// Redis-backed session storage. Keys expire with the session.
pub struct RedisSessionStore {
    pool: Pool,
}

impl RedisSessionStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn session_key(id: &SessionId) -> String {
        format!("b2c_session:{}", id)
    }
}

#[async_trait]
impl SessionRepository for RedisSessionStore {
    async fn load_session(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        let key = Self::session_key(id);
        let value: Option<String> = self
            .pool
            .get(&key)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        match value {
            Some(json) => {
                let record: SessionRecord =
                    serde_json::from_str(&json).map_err(|e| AuthError::Storage(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn save_session(&self, record: &SessionRecord) -> Result<()> {
        let key = Self::session_key(&record.id);
        let value =
            serde_json::to_string(record).map_err(|e| AuthError::Storage(e.to_string()))?;

        // Redis rejects EX 0, so an already expired record keeps one second.
        let ttl_secs = (record.expires_at - Utc::now()).num_seconds().max(1);

        self.pool
            .set::<(), _, _>(&key, &value, Some(Expiration::EX(ttl_secs)), None, false)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn delete_session(&self, id: &SessionId) -> Result<()> {
        let key = Self::session_key(id);
        self.pool
            .del::<(), _>(&key)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        Ok(())
    }
}
