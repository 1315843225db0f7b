//! Login, callback, logout and silent token acquisition over a browser
//! session.
//!
//! Every operation works on the session's [`WebSession`] in place. Callers
//! persist the session afterwards (see [`crate::BrowserSession::save`]).

use b2clogin_core::auth::{
    flow_max_age, is_flow_expired, CallbackOutcome, CallbackParams, TokenCache, TokenResult,
    UserFlow, WebSession,
};
use chrono::Utc;
use url::Url;

use crate::error::AuthError;
use crate::AuthState;

/// Start an authorization-code flow and remember it in the session.
///
/// Allowed from any state. A new flow replaces a pending one.
pub async fn start_login(
    state: &AuthState,
    session: &mut WebSession,
    user_flow: UserFlow,
) -> Result<String, AuthError> {
    let flow = state
        .identity
        .initiate_auth_code_flow(user_flow, &state.config.scopes)
        .await?;

    let auth_uri = flow.auth_uri.clone();
    session.flow = Some(flow);

    tracing::debug!(%user_flow, "Started authorization code flow");
    Ok(auth_uri)
}

/// Complete the pending flow with the redirect parameters.
///
/// A response whose `state` does not match leaves the session untouched.
/// Otherwise the flow leaves the session before the exchange, so a callback
/// can only be processed once. Only `Authenticated` touches `user` and the
/// token cache.
pub async fn handle_callback(
    state: &AuthState,
    session: &mut WebSession,
    params: &CallbackParams,
) -> Result<CallbackOutcome, AuthError> {
    if session
        .flow
        .as_ref()
        .is_some_and(|flow| params.state.as_deref() != Some(flow.state.as_str()))
    {
        tracing::warn!("Discarded authorization response with mismatched state");
        return Ok(CallbackOutcome::ValidationError(
            "state does not match the pending flow".to_string(),
        ));
    }

    // The flow is consumed only once the response is known to belong to it.
    let Some(flow) = session.flow.take() else {
        return Ok(CallbackOutcome::ValidationError(
            "no authorization flow is pending".to_string(),
        ));
    };

    if is_flow_expired(&flow, Utc::now(), flow_max_age()) {
        return Ok(CallbackOutcome::ValidationError(
            "authorization flow expired".to_string(),
        ));
    }

    let mut cache = load_cache(session);
    let outcome = state
        .identity
        .acquire_token_by_auth_code_flow(&flow, params, &mut cache)
        .await?;

    match &outcome {
        CallbackOutcome::Authenticated(claims) => {
            tracing::info!(
                user_flow = %flow.user_flow,
                user = claims.object_id().unwrap_or("unknown"),
                "User signed in"
            );
            session.user = Some(claims.clone());
            save_cache(session, &cache)?;
        }
        CallbackOutcome::ProviderError(error) => {
            tracing::info!(%error, "Identity provider reported an error");
        }
        CallbackOutcome::ValidationError(reason) => {
            tracing::warn!(%reason, "Discarded authorization response");
        }
    }

    Ok(outcome)
}

/// Clear the session and return the provider logout URL.
pub fn logout(state: &AuthState, session: &mut WebSession) -> Result<Url, AuthError> {
    session.clear();
    Ok(state.config.logout_url()?)
}

/// Access token for the first cached account, without user interaction.
///
/// Returns `None` when no account is cached or no token can be obtained.
pub async fn get_token_silently(
    state: &AuthState,
    session: &mut WebSession,
    scopes: &[String],
) -> Result<Option<TokenResult>, AuthError> {
    let mut cache = load_cache(session);

    let Some(account) = cache.accounts().into_iter().next() else {
        return Ok(None);
    };

    let result = state
        .identity
        .acquire_token_silent(scopes, &account, &mut cache)
        .await?;
    save_cache(session, &cache)?;

    Ok(result)
}

/// Restore the session's token cache. A blob that no longer parses is
/// dropped rather than failing the request.
fn load_cache(session: &WebSession) -> TokenCache {
    match session.token_cache.as_deref() {
        Some(blob) => TokenCache::deserialize(blob).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Discarding unreadable token cache");
            TokenCache::new()
        }),
        None => TokenCache::new(),
    }
}

/// Write the cache back into the session when it changed.
fn save_cache(session: &mut WebSession, cache: &TokenCache) -> Result<(), AuthError> {
    if cache.has_state_changed() {
        session.token_cache = Some(cache.serialize()?);
    }
    Ok(())
}
