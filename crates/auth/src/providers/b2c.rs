//! Azure AD B2C identity client.

use async_trait::async_trait;
use b2clogin_core::auth::{
    Account, AuthCodeFlow, AuthError, CachedAccessToken, CallbackOutcome, CallbackParams,
    IdentityClient, ProviderError, Result, TokenCache, TokenResult, UserClaims, UserFlow,
};
use base64::Engine;
use chrono::{Duration, Utc};
use openidconnect::{
    core::{
        CoreAuthenticationFlow, CoreClient, CoreIdToken, CoreJsonWebKeySet, CoreProviderMetadata,
        CoreTokenResponse,
    },
    reqwest, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointMaybeSet,
    EndpointNotSet, EndpointSet, Nonce, OAuth2TokenResponse, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse,
};

use super::{authorization_code, resource_scopes, OFFLINE_ACCESS};
use crate::config::B2cConfig;

/// Type alias for a CoreClient configured from provider metadata.
///
/// `from_provider_metadata` returns a client with:
/// - HasAuthUrl = EndpointSet (always set from discovery)
/// - HasDeviceAuthUrl = EndpointNotSet
/// - HasIntrospectionUrl = EndpointNotSet
/// - HasRevocationUrl = EndpointNotSet
/// - HasTokenUrl = EndpointMaybeSet (may or may not be in discovery)
/// - HasUserInfoUrl = EndpointMaybeSet (may or may not be in discovery)
///
/// Calling `set_redirect_uri` preserves these type parameters.
type ConfiguredCoreClient = CoreClient<
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointMaybeSet,
    EndpointMaybeSet,
>;

/// Lifetime assumed for access tokens whose response omits `expires_in`.
fn default_token_lifetime() -> Duration {
    Duration::hours(1)
}

/// Azure AD B2C client. Each user flow is its own OIDC authority with its
/// own metadata, so one `CoreClient` is kept per flow.
pub struct B2cClient {
    sign_up_sign_in: ConfiguredCoreClient,
    edit_profile: ConfiguredCoreClient,
    http_client: reqwest::Client,
    client_id: String,
    redirect_uri: String,
}

impl B2cClient {
    /// Create the client by fetching the metadata and signing keys of both
    /// user flow authorities.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The HTTP client cannot be built
    /// - Metadata or key retrieval fails (network error or invalid document)
    /// - The redirect URI is invalid
    pub async fn new(config: &B2cConfig) -> Result<Self> {
        // Build HTTP client without redirect following (security requirement)
        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::Provider(format!("Failed to build HTTP client: {}", e)))?;

        let sign_up_sign_in =
            Self::discover(config, UserFlow::SignUpSignIn, &http_client).await?;
        let edit_profile = Self::discover(config, UserFlow::EditProfile, &http_client).await?;

        Ok(Self {
            sign_up_sign_in,
            edit_profile,
            http_client,
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.to_string(),
        })
    }

    /// B2C serves its discovery document under `{authority}/v2.0`, while the
    /// issuer it advertises is tenant-ID based. `discover_async` would reject
    /// that mismatch, so the document is fetched directly and the ID-token
    /// verifier checks tokens against the advertised issuer.
    async fn discover(
        config: &B2cConfig,
        user_flow: UserFlow,
        http_client: &reqwest::Client,
    ) -> Result<ConfiguredCoreClient> {
        let discovery_url = format!(
            "{}/v2.0/.well-known/openid-configuration",
            config.authority(user_flow)
        );

        tracing::debug!(%user_flow, url = %discovery_url, "Fetching B2C metadata");

        let body = http_client
            .get(&discovery_url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AuthError::Provider(format!("{discovery_url}: {e}")))?
            .bytes()
            .await
            .map_err(|e| AuthError::Provider(format!("{discovery_url}: {e}")))?;

        let metadata: CoreProviderMetadata = serde_json::from_slice(&body)
            .map_err(|e| AuthError::Provider(format!("invalid metadata: {e}")))?;

        let jwks = CoreJsonWebKeySet::fetch_async(metadata.jwks_uri(), http_client)
            .await
            .map_err(|e| AuthError::Provider(format!("failed to fetch signing keys: {e}")))?;

        let client = CoreClient::from_provider_metadata(
            metadata.set_jwks(jwks),
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret().to_string())),
        )
        .set_redirect_uri(
            RedirectUrl::new(config.redirect_uri.to_string())
                .map_err(|e| AuthError::Provider(e.to_string()))?,
        );

        Ok(client)
    }

    fn client(&self, user_flow: UserFlow) -> &ConfiguredCoreClient {
        match user_flow {
            UserFlow::SignUpSignIn => &self.sign_up_sign_in,
            UserFlow::EditProfile => &self.edit_profile,
        }
    }

    /// Store the tokens of a response and return the access token entry.
    fn cache_response(
        cache: &mut TokenCache,
        account: Account,
        id_token: Option<String>,
        response: &CoreTokenResponse,
        scopes: &[String],
    ) -> CachedAccessToken {
        let lifetime = response
            .expires_in()
            .and_then(|d| Duration::from_std(d).ok())
            .unwrap_or_else(default_token_lifetime);

        let access_token = CachedAccessToken {
            secret: response.access_token().secret().clone(),
            token_type: token_type_name(response),
            scopes: scopes.to_vec(),
            expires_at: Utc::now() + lifetime,
        };

        cache.save_tokens(
            account,
            id_token,
            Some(access_token.clone()),
            response.refresh_token().map(|t| t.secret().clone()),
        );

        access_token
    }
}

fn token_type_name(response: &CoreTokenResponse) -> String {
    serde_json::to_value(response.token_type())
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_else(|| "Bearer".to_string())
}

/// Full claim set of an ID token whose signature was already verified.
///
/// `IdTokenClaims` only exposes the standard claims, and B2C puts `emails`,
/// `oid` and custom attributes alongside them.
fn raw_claims(id_token: &CoreIdToken) -> std::result::Result<(String, UserClaims), String> {
    let jwt = serde_json::to_value(id_token)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .ok_or("ID token is not a compact JWT")?;

    let payload = jwt.split('.').nth(1).ok_or("ID token has no payload")?;
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| e.to_string())?;
    let value: serde_json::Value = serde_json::from_slice(&decoded).map_err(|e| e.to_string())?;
    let claims = UserClaims::from_value(value).ok_or("ID token payload is not an object")?;

    Ok((jwt, claims))
}

fn account_for(claims: &UserClaims, user_flow: UserFlow) -> Option<Account> {
    let object_id = claims.object_id()?;
    Some(Account {
        home_account_id: format!("{object_id}-{user_flow}"),
        username: claims.email().map(String::from),
        user_flow,
    })
}

#[async_trait]
impl IdentityClient for B2cClient {
    async fn initiate_auth_code_flow(
        &self,
        user_flow: UserFlow,
        scopes: &[String],
    ) -> Result<AuthCodeFlow> {
        let scopes = resource_scopes(scopes, &self.client_id);
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = self.client(user_flow).authorize_url(
            CoreAuthenticationFlow::AuthorizationCode,
            CsrfToken::new_random,
            Nonce::new_random,
        );
        for scope in &scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token, nonce) = request
            .add_scope(Scope::new(OFFLINE_ACCESS.to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        Ok(AuthCodeFlow {
            auth_uri: auth_url.to_string(),
            state: csrf_token.secret().clone(),
            nonce: nonce.secret().clone(),
            code_verifier: pkce_verifier.secret().clone(),
            redirect_uri: self.redirect_uri.clone(),
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

        let client = self.client(flow.user_flow);
        let response = client
            .exchange_code(AuthorizationCode::new(code))
            .map_err(|e| AuthError::CodeExchange(e.to_string()))?
            .set_pkce_verifier(PkceCodeVerifier::new(flow.code_verifier.clone()))
            .request_async(&self.http_client)
            .await;

        let response = match response {
            Ok(response) => response,
            Err(RequestTokenError::ServerResponse(err)) => {
                let body = serde_json::to_value(&err)
                    .map_err(|e| AuthError::CodeExchange(e.to_string()))?;
                return Ok(CallbackOutcome::ProviderError(ProviderError::from_json(
                    &body,
                )));
            }
            Err(e) => return Err(AuthError::CodeExchange(e.to_string())),
        };

        let Some(id_token) = response.id_token() else {
            return Ok(CallbackOutcome::ValidationError(
                "token response carries no ID token".to_string(),
            ));
        };

        let nonce = Nonce::new(flow.nonce.clone());
        if let Err(e) = id_token.claims(&client.id_token_verifier(), &nonce) {
            return Ok(CallbackOutcome::ValidationError(e.to_string()));
        }

        let (jwt, claims) = match raw_claims(id_token) {
            Ok(decoded) => decoded,
            Err(reason) => return Ok(CallbackOutcome::ValidationError(reason)),
        };

        match account_for(&claims, flow.user_flow) {
            Some(account) => {
                Self::cache_response(cache, account, Some(jwt), &response, &flow.scopes);
            }
            None => tracing::warn!("ID token has neither oid nor sub, tokens not cached"),
        }

        Ok(CallbackOutcome::Authenticated(claims))
    }

    async fn acquire_token_silent(
        &self,
        scopes: &[String],
        account: &Account,
        cache: &mut TokenCache,
    ) -> Result<Option<TokenResult>> {
        let scopes = resource_scopes(scopes, &self.client_id);

        if let Some(token) = cache.find_access_token(account, &scopes, Utc::now()) {
            return Ok(Some(TokenResult {
                access_token: token.secret.clone(),
                token_type: token.token_type.clone(),
                scopes: token.scopes.clone(),
                expires_at: token.expires_at,
                from_cache: true,
            }));
        }

        let Some(refresh_token) = cache.refresh_token(account).map(String::from) else {
            return Ok(None);
        };
        let refresh_token = RefreshToken::new(refresh_token);

        let response = self
            .client(account.user_flow)
            .exchange_refresh_token(&refresh_token)
            .map_err(|e| AuthError::TokenRefresh(e.to_string()))?
            .add_scopes(scopes.iter().map(|s| Scope::new(s.clone())))
            .add_scope(Scope::new(OFFLINE_ACCESS.to_string()))
            .request_async(&self.http_client)
            .await;

        let response = match response {
            Ok(response) => response,
            Err(RequestTokenError::ServerResponse(err)) => {
                tracing::warn!(
                    account = %account.home_account_id,
                    error = %err,
                    "Refresh token rejected"
                );
                return Ok(None);
            }
            Err(e) => return Err(AuthError::TokenRefresh(e.to_string())),
        };

        let token = Self::cache_response(cache, account.clone(), None, &response, &scopes);

        Ok(Some(TokenResult {
            access_token: token.secret,
            token_type: token.token_type,
            scopes: token.scopes,
            expires_at: token.expires_at,
            from_cache: false,
        }))
    }
}
