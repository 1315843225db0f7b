//! Mock identity client for development and testing.
//!
//! Builds authorization URLs against the configured authority host (the mock
//! IdP in development) and accepts authorization codes that carry the user's
//! claims and the flow nonce as base64 JSON.

use async_trait::async_trait;
use b2clogin_core::auth::{
    generate_state, Account, AuthCodeFlow, AuthError, CachedAccessToken, CallbackOutcome,
    CallbackParams, IdentityClient, ProviderError, Result, TokenCache, TokenResult, UserClaims,
    UserFlow,
};
use base64::Engine;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use url::Url;

use super::{authorization_code, resource_scopes, OFFLINE_ACCESS};
use crate::config::B2cConfig;

/// Encode an authorization code the way the mock IdP issues them.
pub fn encode_mock_code(claims: &Value, nonce: &str) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .encode(json!({ "claims": claims, "nonce": nonce }).to_string())
}

fn decode_mock_code(code: &str) -> Option<(Value, String)> {
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(code)
        .ok()?;
    let mut json: Value = serde_json::from_slice(&decoded).ok()?;
    let nonce = json.get("nonce")?.as_str()?.to_string();
    Some((json.get_mut("claims")?.take(), nonce))
}

/// Identity client that never leaves the process for token work.
pub struct MockIdentityClient {
    config: B2cConfig,
}

impl MockIdentityClient {
    pub fn new(config: B2cConfig) -> Self {
        Self { config }
    }

    fn issue(account: &Account, scopes: &[String], cache: &mut TokenCache) -> CachedAccessToken {
        let token = CachedAccessToken {
            secret: format!("mock-access-{}", generate_state()),
            token_type: "Bearer".to_string(),
            scopes: scopes.to_vec(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        cache.save_tokens(
            account.clone(),
            None,
            Some(token.clone()),
            Some(format!("mock-refresh-{}", generate_state())),
        );
        token
    }
}

#[async_trait]
impl IdentityClient for MockIdentityClient {
    async fn initiate_auth_code_flow(
        &self,
        user_flow: UserFlow,
        scopes: &[String],
    ) -> Result<AuthCodeFlow> {
        let scopes = resource_scopes(scopes, &self.config.client_id);
        let state = generate_state();
        let nonce = generate_state();
        let code_verifier = generate_state();

        let mut url = Url::parse(&format!(
            "{}/oauth2/v2.0/authorize",
            self.config.authority(user_flow)
        ))
        .map_err(|e| AuthError::Provider(e.to_string()))?;

        let scope = std::iter::once("openid")
            .chain(scopes.iter().map(String::as_str))
            .chain(std::iter::once(OFFLINE_ACCESS))
            .collect::<Vec<_>>()
            .join(" ");

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("scope", &scope)
            .append_pair("state", &state)
            .append_pair("nonce", &nonce);

        Ok(AuthCodeFlow {
            auth_uri: url.to_string(),
            state,
            nonce,
            code_verifier,
            redirect_uri: self.config.redirect_uri.to_string(),
            scopes,
            user_flow,
            created_at: Utc::now(),
        })
    }

    async fn acquire_token_by_auth_code_flow(
        &self,
        flow: &AuthCodeFlow,
        params: &CallbackParams,
        cache: &mut TokenCache,
    ) -> Result<CallbackOutcome> {
        let code = match authorization_code(flow, params) {
            Ok(code) => code,
            Err(outcome) => return Ok(outcome),
        };

        // An unreadable code is what a real token endpoint rejects with invalid_grant.
        let Some((claims, nonce)) = decode_mock_code(&code) else {
            return Ok(CallbackOutcome::ProviderError(ProviderError::new(
                "invalid_grant",
                Some("The provided authorization code is invalid.".to_string()),
            )));
        };

        if nonce != flow.nonce {
            return Ok(CallbackOutcome::ValidationError(
                "nonce does not match the pending flow".to_string(),
            ));
        }

        let Some(claims) = UserClaims::from_value(claims) else {
            return Ok(CallbackOutcome::ValidationError(
                "claims are not an object".to_string(),
            ));
        };

        if let Some(object_id) = claims.object_id() {
            let account = Account {
                home_account_id: format!("{object_id}-{}", flow.user_flow),
                username: claims.email().map(String::from),
                user_flow: flow.user_flow,
            };
            cache.save_tokens(
                account.clone(),
                Some(format!("mock-id-token-{}", generate_state())),
                None,
                None,
            );
            Self::issue(&account, &flow.scopes, cache);
        }

        Ok(CallbackOutcome::Authenticated(claims))
    }

    async fn acquire_token_silent(
        &self,
        scopes: &[String],
        account: &Account,
        cache: &mut TokenCache,
    ) -> Result<Option<TokenResult>> {
        let scopes = resource_scopes(scopes, &self.config.client_id);

        if let Some(token) = cache.find_access_token(account, &scopes, Utc::now()) {
            return Ok(Some(TokenResult {
                access_token: token.secret.clone(),
                token_type: token.token_type.clone(),
                scopes: token.scopes.clone(),
                expires_at: token.expires_at,
                from_cache: true,
            }));
        }

        if cache.refresh_token(account).is_none() {
            return Ok(None);
        }

        let token = Self::issue(account, &scopes, cache);
        Ok(Some(TokenResult {
            access_token: token.secret,
            token_type: token.token_type,
            scopes: token.scopes,
            expires_at: token.expires_at,
            from_cache: false,
        }))
    }
}
