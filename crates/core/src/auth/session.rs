//! Typed browser session.
//!
//! Everything the application remembers about a browser lives in a
//! [`WebSession`] with three optional slots. The slot combination decides the
//! [`SessionState`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AuthCodeFlow, UserClaims};

/// Cryptographically random session identifier, carried in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authentication state derived from the session contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No user and no pending flow.
    Anonymous,
    /// A flow was started and the callback has not been processed yet.
    FlowPending,
    /// Claims are present.
    Authenticated,
}

/// Per-browser session data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebSession {
    /// Pending authorization-code flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<AuthCodeFlow>,
    /// Serialized [`TokenCache`](super::TokenCache). Only the identity client
    /// looks inside.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_cache: Option<String>,
    /// Claims of the signed-in user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserClaims>,
}

impl WebSession {
    pub fn state(&self) -> SessionState {
        match (&self.user, &self.flow) {
            (Some(_), _) => SessionState::Authenticated,
            (None, Some(_)) => SessionState::FlowPending,
            (None, None) => SessionState::Anonymous,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Drop every slot.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.flow.is_none() && self.token_cache.is_none() && self.user.is_none()
    }
}

/// Stored session: data plus bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub data: WebSession,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
