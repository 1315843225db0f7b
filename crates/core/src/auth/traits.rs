use async_trait::async_trait;

use super::{
    Account, AuthCodeFlow, AuthError, CallbackOutcome, CallbackParams, SessionId, SessionRecord,
    TokenCache, TokenResult, UserFlow,
};

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Abstraction over the identity provider (authorization-code flow, token
/// exchange, ID-token validation, silent refresh).
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Start a new authorization-code flow against the given user flow.
    async fn initiate_auth_code_flow(
        &self,
        user_flow: UserFlow,
        scopes: &[String],
    ) -> Result<AuthCodeFlow>;

    /// Complete a flow with the parameters the provider sent to the
    /// redirect URI. Tokens are stored in `cache` on success.
    ///
    /// Provider-reported errors and validation failures are outcomes, not
    /// errors. `Err` means the provider could not be reached or answered
    /// with something unusable.
    async fn acquire_token_by_auth_code_flow(
        &self,
        flow: &AuthCodeFlow,
        params: &CallbackParams,
        cache: &mut TokenCache,
    ) -> Result<CallbackOutcome>;

    /// Get an access token for `account` without user interaction, from
    /// `cache` or through a refresh-token grant.
    ///
    /// Returns `None` when no usable token can be obtained.
    async fn acquire_token_silent(
        &self,
        scopes: &[String],
        account: &Account,
        cache: &mut TokenCache,
    ) -> Result<Option<TokenResult>>;
}

/// Session storage abstraction.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Retrieve a session by ID.
    async fn load_session(&self, id: &SessionId) -> Result<Option<SessionRecord>>;

    /// Insert or replace a session.
    async fn save_session(&self, record: &SessionRecord) -> Result<()>;

    /// Delete a session. Deleting a missing session is not an error.
    async fn delete_session(&self, id: &SessionId) -> Result<()>;
}
