use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::serde::deserialize_optional_string;

/// B2C user flows (policies) this application can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserFlow {
    SignUpSignIn,
    EditProfile,
}

impl std::fmt::Display for UserFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SignUpSignIn => write!(f, "sign_up_sign_in"),
            Self::EditProfile => write!(f, "edit_profile"),
        }
    }
}

/// Pending authorization-code flow, stored in the session between the
/// redirect to the provider and the callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthCodeFlow {
    /// Where the browser is sent to authenticate.
    pub auth_uri: String,
    /// Anti-forgery value echoed back by the provider.
    pub state: String,
    /// Value the ID token must carry in its `nonce` claim.
    pub nonce: String,
    /// PKCE verifier sent with the code exchange.
    pub code_verifier: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub user_flow: UserFlow,
    pub created_at: DateTime<Utc>,
}

/// Query parameters the provider appends to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CallbackParams {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub error_description: Option<String>,
}

/// Error reported by the identity provider, either on the redirect or in the
/// token endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    pub error: String,
    pub error_description: Option<String>,
}

impl ProviderError {
    pub fn new(error: impl Into<String>, error_description: Option<String>) -> Self {
        Self {
            error: error.into(),
            error_description,
        }
    }

    /// Build from an OAuth2 error response body.
    ///
    /// Falls back to `unknown_error` when the body has no `error` field.
    pub fn from_json(body: &Value) -> Self {
        let error = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error")
            .to_string();
        let error_description = body
            .get("error_description")
            .and_then(Value::as_str)
            .map(String::from);

        Self {
            error,
            error_description,
        }
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error_description {
            Some(description) => write!(f, "{}: {}", self.error, description),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Result of completing an authorization-code flow.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    /// Tokens acquired and the ID token validated.
    Authenticated(UserClaims),
    /// The provider reported an error.
    ProviderError(ProviderError),
    /// The callback did not match the pending flow (state, nonce, missing
    /// code or flow, invalid ID token).
    ValidationError(String),
}

/// Identity attributes decoded from a validated ID token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserClaims(Map<String, Value>);

impl UserClaims {
    /// Returns `None` unless the value is a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    pub fn get_str(&self, claim: &str) -> Option<&str> {
        self.0.get(claim).and_then(Value::as_str)
    }

    pub fn subject(&self) -> Option<&str> {
        self.get_str("sub")
    }

    /// Stable account identifier: B2C's `oid` when present, else `sub`.
    pub fn object_id(&self) -> Option<&str> {
        self.get_str("oid").or_else(|| self.subject())
    }

    /// First address of the B2C `emails` claim, or `email`.
    pub fn email(&self) -> Option<&str> {
        self.0
            .get("emails")
            .and_then(Value::as_array)
            .and_then(|emails| emails.first())
            .and_then(Value::as_str)
            .or_else(|| self.get_str("email"))
    }

    /// Name to greet the user with.
    pub fn display_name(&self) -> &str {
        self.get_str("name")
            .or_else(|| self.email())
            .or_else(|| self.subject())
            .unwrap_or("User")
    }

    /// Claims as `(name, value)` pairs, strings unquoted, sorted by name.
    pub fn display_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .0
            .iter()
            .map(|(name, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name.clone(), rendered)
            })
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }
}

/// Account known to the token cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub home_account_id: String,
    pub username: Option<String>,
    /// User flow the account's tokens were issued under.
    pub user_flow: UserFlow,
}

/// Access token handed to callers of silent acquisition.
#[derive(Clone, PartialEq, Serialize)]
pub struct TokenResult {
    #[serde(skip_serializing)]
    pub access_token: String,
    pub token_type: String,
    pub scopes: Vec<String>,
    pub expires_at: DateTime<Utc>,
    /// Whether the token came from the cache without contacting the provider.
    pub from_cache: bool,
}

impl std::fmt::Debug for TokenResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResult")
            .field("access_token", &"[redacted]")
            .field("token_type", &self.token_type)
            .field("scopes", &self.scopes)
            .field("expires_at", &self.expires_at)
            .field("from_cache", &self.from_cache)
            .finish()
    }
}
