use std::time::Duration;

use b2clogin_core::auth::UserFlow;
use thiserror::Error;
use url::Url;

/// Path the provider redirects back to. Its absolute form must match the
/// redirect URI registered for the application in the B2C tenant.
pub const REDIRECT_PATH: &str = "/getAToken";

const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_SIGNUP_SIGNIN_USER_FLOW: &str = "B2C_1_susi";
const DEFAULT_EDIT_PROFILE_USER_FLOW: &str = "B2C_1_edit_profile";
const DEFAULT_SESSION_TTL_HOURS: u64 = 24;
/// One hundred years.
const MAX_SESSION_TTL_HOURS: u64 = 24 * 365 * 100;

/// Configuration errors. All of them stop the process at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Need to define {0} environment variable")]
    MissingVar(&'static str),

    #[error("{var} is not a valid URL: {reason}")]
    InvalidUrl { var: &'static str, reason: String },

    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Azure AD B2C application configuration.
#[derive(Clone)]
pub struct B2cConfig {
    pub tenant: String,
    pub client_id: String,
    client_secret: String,
    /// Scheme and host serving the B2C endpoints.
    pub authority_host: Url,
    pub signup_signin_user_flow: String,
    pub edit_profile_user_flow: String,
    /// Scopes requested at sign-in, on top of the OIDC defaults.
    pub scopes: Vec<String>,
    /// Public URL of this application.
    pub base_url: Url,
    pub redirect_uri: Url,
    pub session_ttl: Duration,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

impl B2cConfig {
    /// Load from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `B2C_TENANT`: B2C tenant name, e.g. `contoso` (required)
    /// - `APP_CLIENT_ID`: application (client) ID (required)
    /// - `APP_CLIENT_SECRET`: client secret (required)
    /// - `APP_BASE_URL`: public URL of this app (default: `http://localhost:5000`)
    /// - `B2C_AUTHORITY_HOST`: B2C host (default: `https://{tenant}.b2clogin.com`)
    /// - `B2C_SIGNUP_SIGNIN_USER_FLOW`: sign-up/sign-in policy (default: `B2C_1_susi`)
    /// - `B2C_EDIT_PROFILE_USER_FLOW`: profile-edit policy (default: `B2C_1_edit_profile`)
    /// - `B2C_SCOPES`: space-separated extra scopes (default: none)
    /// - `SESSION_TTL_HOURS`: browser session lifetime (default: 24)
    /// - `COOKIE_SECURE`: secure flag on the session cookie (default: true for https base URLs)
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or empty, or if a
    /// URL or number does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. See [`B2cConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tenant = required(&lookup, "B2C_TENANT")?;
        let client_id = required(&lookup, "APP_CLIENT_ID")?;
        let client_secret = required(&lookup, "APP_CLIENT_SECRET")?;

        let base_url = parse_url(
            "APP_BASE_URL",
            &optional(&lookup, "APP_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        )?;

        let authority_host = parse_url(
            "B2C_AUTHORITY_HOST",
            &optional(&lookup, "B2C_AUTHORITY_HOST")
                .unwrap_or_else(|| format!("https://{tenant}.b2clogin.com")),
        )?;

        let redirect_uri = base_url
            .join(REDIRECT_PATH)
            .map_err(|e| ConfigError::InvalidUrl {
                var: "APP_BASE_URL",
                reason: e.to_string(),
            })?;

        let scopes = optional(&lookup, "B2C_SCOPES")
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default();

        let session_ttl_hours = match optional(&lookup, "SESSION_TTL_HOURS") {
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|hours| (1..=MAX_SESSION_TTL_HOURS).contains(hours))
                .ok_or(ConfigError::InvalidNumber {
                    var: "SESSION_TTL_HOURS",
                    value,
                })?,
            None => DEFAULT_SESSION_TTL_HOURS,
        };

        let cookie_secure = optional(&lookup, "COOKIE_SECURE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(base_url.scheme() == "https");

        Ok(Self {
            tenant,
            client_id,
            client_secret,
            authority_host,
            signup_signin_user_flow: optional(&lookup, "B2C_SIGNUP_SIGNIN_USER_FLOW")
                .unwrap_or_else(|| DEFAULT_SIGNUP_SIGNIN_USER_FLOW.to_string()),
            edit_profile_user_flow: optional(&lookup, "B2C_EDIT_PROFILE_USER_FLOW")
                .unwrap_or_else(|| DEFAULT_EDIT_PROFILE_USER_FLOW.to_string()),
            scopes,
            base_url,
            redirect_uri,
            session_ttl: Duration::from_secs(session_ttl_hours * 60 * 60),
            cookie_name: "b2c_session".to_string(),
            cookie_secure,
        })
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Policy name for a user flow.
    pub fn user_flow_name(&self, user_flow: UserFlow) -> &str {
        match user_flow {
            UserFlow::SignUpSignIn => &self.signup_signin_user_flow,
            UserFlow::EditProfile => &self.edit_profile_user_flow,
        }
    }

    /// Authority for a user flow:
    /// `{authority_host}/{tenant}.onmicrosoft.com/{user_flow}`.
    pub fn authority(&self, user_flow: UserFlow) -> String {
        format!(
            "{}/{}.onmicrosoft.com/{}",
            self.authority_host.as_str().trim_end_matches('/'),
            self.tenant,
            self.user_flow_name(user_flow)
        )
    }

    /// Where the provider sends the browser after signing out.
    pub fn post_logout_redirect_uri(&self) -> Url {
        let mut url = self.base_url.clone();
        url.set_path("/");
        url.set_query(None);
        url.set_fragment(None);
        url
    }

    /// Provider logout endpoint that also ends the B2C session, then returns
    /// the browser to the home page.
    pub fn logout_url(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&format!(
            "{}/oauth2/v2.0/logout",
            self.authority(UserFlow::SignUpSignIn)
        ))
        .map_err(|e| ConfigError::InvalidUrl {
            var: "B2C_AUTHORITY_HOST",
            reason: e.to_string(),
        })?;

        url.query_pairs_mut().append_pair(
            "post_logout_redirect_uri",
            self.post_logout_redirect_uri().as_str(),
        );

        Ok(url)
    }
}

impl std::fmt::Debug for B2cConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("B2cConfig")
            .field("tenant", &self.tenant)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("authority_host", &self.authority_host.as_str())
            .field("signup_signin_user_flow", &self.signup_signin_user_flow)
            .field("edit_profile_user_flow", &self.edit_profile_user_flow)
            .field("scopes", &self.scopes)
            .field("base_url", &self.base_url.as_str())
            .field("session_ttl", &self.session_ttl)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

fn optional<F>(lookup: &F, var: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var).filter(|value| !value.trim().is_empty())
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, var).ok_or(ConfigError::MissingVar(var))
}

fn parse_url(var: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        var,
        reason: e.to_string(),
    })
}
