//! In-memory session storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use b2clogin_core::auth::{Result, SessionId, SessionRecord, SessionRepository};

/// In-memory session store for development and testing.
///
/// Sessions live in a HashMap wrapped in `Arc<RwLock<_>>` and are lost when
/// the process exits.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionStore {
    async fn load_session(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id.as_str()).cloned())
    }

    async fn save_session(&self, record: &SessionRecord) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(record.id.as_str().to_string(), record.clone());
        Ok(())
    }

    async fn delete_session(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id.as_str());
        Ok(())
    }
}
