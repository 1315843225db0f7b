//! Serializable token cache.
//!
//! One cache lives in each browser session as a JSON blob. The identity
//! client deserializes it, reads or stores tokens, and the orchestrator writes
//! it back only when [`TokenCache::has_state_changed`] says so.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Account, AuthError, Result};

/// Access tokens this close to expiry are treated as expired.
fn expiry_skew() -> Duration {
    Duration::minutes(5)
}

/// Access token with the scopes it was granted for.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAccessToken {
    pub secret: String,
    pub token_type: String,
    pub scopes: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

impl CachedAccessToken {
    /// True when the token covers every requested scope.
    pub fn covers(&self, scopes: &[String]) -> bool {
        scopes.iter().all(|scope| self.scopes.contains(scope))
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - expiry_skew() > now
    }
}

impl std::fmt::Debug for CachedAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedAccessToken")
            .field("secret", &"[redacted]")
            .field("token_type", &self.token_type)
            .field("scopes", &self.scopes)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct CacheEntry {
    account: Account,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id_token: Option<String>,
    #[serde(default)]
    access_tokens: Vec<CachedAccessToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

/// Accounts and their tokens.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TokenCache {
    #[serde(default)]
    entries: Vec<CacheEntry>,
    #[serde(skip)]
    state_changed: bool,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a cache from its serialized form. The result reports no
    /// state change.
    pub fn deserialize(blob: &str) -> Result<Self> {
        serde_json::from_str(blob).map_err(|e| AuthError::TokenCache(e.to_string()))
    }

    pub fn serialize(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| AuthError::TokenCache(e.to_string()))
    }

    /// Whether anything was written since the cache was created or restored.
    pub fn has_state_changed(&self) -> bool {
        self.state_changed
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.entries.iter().map(|e| e.account.clone()).collect()
    }

    /// Store tokens for an account.
    ///
    /// An access token replaces any cached token granted for the same scopes.
    /// `None` for the ID or refresh token keeps the previous value.
    pub fn save_tokens(
        &mut self,
        account: Account,
        id_token: Option<String>,
        access_token: Option<CachedAccessToken>,
        refresh_token: Option<String>,
    ) {
        let index = match self.position(&account.home_account_id) {
            Some(index) => index,
            None => {
                self.entries.push(CacheEntry {
                    account: account.clone(),
                    id_token: None,
                    access_tokens: Vec::new(),
                    refresh_token: None,
                });
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[index];
        entry.account = account;
        if id_token.is_some() {
            entry.id_token = id_token;
        }
        if let Some(token) = access_token {
            entry
                .access_tokens
                .retain(|cached| !same_scopes(&cached.scopes, &token.scopes));
            entry.access_tokens.push(token);
        }
        if refresh_token.is_some() {
            entry.refresh_token = refresh_token;
        }

        self.state_changed = true;
    }

    /// Unexpired access token covering `scopes`.
    pub fn find_access_token(
        &self,
        account: &Account,
        scopes: &[String],
        now: DateTime<Utc>,
    ) -> Option<&CachedAccessToken> {
        self.entry(&account.home_account_id)?
            .access_tokens
            .iter()
            .filter(|token| token.covers(scopes) && token.is_fresh(now))
            .max_by_key(|token| token.expires_at)
    }

    pub fn refresh_token(&self, account: &Account) -> Option<&str> {
        self.entry(&account.home_account_id)?
            .refresh_token
            .as_deref()
    }

    fn position(&self, home_account_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.account.home_account_id == home_account_id)
    }

    fn entry(&self, home_account_id: &str) -> Option<&CacheEntry> {
        self.entries
            .iter()
            .find(|e| e.account.home_account_id == home_account_id)
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("accounts", &self.accounts())
            .field("state_changed", &self.state_changed)
            .finish()
    }
}

fn same_scopes(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().all(|scope| b.contains(scope))
}
