//! Identity client implementations.
//!
//! - `B2cClient`: Azure AD B2C through `openidconnect`
//! - `MockIdentityClient`: pairs with the mock IdP (with `mock` feature)

mod b2c;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use b2c::B2cClient;
#[cfg(any(test, feature = "mock"))]
pub use mock::{encode_mock_code, MockIdentityClient};

use b2clogin_core::auth::{AuthCodeFlow, CallbackOutcome, CallbackParams, ProviderError};

/// Scope that makes B2C issue a refresh token.
pub(crate) const OFFLINE_ACCESS: &str = "offline_access";

/// Checks the callback against its flow before any token exchange.
///
/// The state must match first, so a forged redirect carrying an `error` is
/// still a validation failure. Returns the authorization code to exchange,
/// or the outcome to report without contacting the provider.
pub(crate) fn authorization_code(
    flow: &AuthCodeFlow,
    params: &CallbackParams,
) -> Result<String, CallbackOutcome> {
    if params.state.as_deref() != Some(flow.state.as_str()) {
        return Err(CallbackOutcome::ValidationError(
            "state does not match the pending flow".to_string(),
        ));
    }

    if let Some(error) = &params.error {
        return Err(CallbackOutcome::ProviderError(ProviderError::new(
            error.clone(),
            params.error_description.clone(),
        )));
    }

    params.code.clone().ok_or_else(|| {
        CallbackOutcome::ValidationError("callback carries no authorization code".to_string())
    })
}

/// Scopes sent to the token endpoint. B2C only returns an access token when
/// a resource scope is requested, so the application's own client ID stands
/// in when none is configured.
pub(crate) fn resource_scopes(scopes: &[String], client_id: &str) -> Vec<String> {
    if scopes.is_empty() {
        vec![client_id.to_string()]
    } else {
        scopes.to_vec()
    }
}
