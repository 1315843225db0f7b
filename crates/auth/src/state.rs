//! Application state for auth.

use axum::extract::FromRef;
use b2clogin_core::auth::{IdentityClient, SessionRepository};
use std::sync::Arc;

use crate::config::B2cConfig;

/// Shared state for auth handlers.
#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<dyn SessionRepository>,
    pub identity: Arc<dyn IdentityClient>,
    pub config: Arc<B2cConfig>,
}

impl AuthState {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        identity: Arc<dyn IdentityClient>,
        config: B2cConfig,
    ) -> Self {
        Self {
            sessions,
            identity,
            config: Arc::new(config),
        }
    }
}

/// Allows AuthState to be extracted from a parent state.
impl<S> FromRef<S> for AuthState
where
    S: AsRef<AuthState>,
{
    fn from_ref(state: &S) -> Self {
        state.as_ref().clone()
    }
}
