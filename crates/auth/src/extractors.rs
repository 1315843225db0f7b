//! Axum extractors for the browser session.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use b2clogin_core::auth::{
    calculate_expiry, generate_session_id, is_session_expired, SessionId, SessionRecord,
    UserClaims, WebSession,
};
use chrono::{DateTime, Duration, Utc};

use crate::error::AuthError;
use crate::AuthState;

/// The session of the requesting browser.
///
/// A missing, unknown or expired cookie yields a fresh, empty session that is
/// only stored once something is written to it. Handlers mutate `data` and
/// hand the session back through [`BrowserSession::save`] or
/// [`BrowserSession::destroy`].
pub struct BrowserSession {
    pub id: SessionId,
    pub data: WebSession,
    created_at: DateTime<Utc>,
    loaded: WebSession,
    is_new: bool,
}

impl BrowserSession {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            id: generate_session_id(),
            data: WebSession::default(),
            created_at: now,
            loaded: WebSession::default(),
            is_new: true,
        }
    }

    /// Persist the session if its data changed and refresh the cookie.
    ///
    /// Returns the jar unchanged when there is nothing to write.
    pub async fn save(self, state: &AuthState, jar: CookieJar) -> Result<CookieJar, AuthError> {
        if self.data == self.loaded {
            return Ok(jar);
        }

        if self.is_new && self.data.is_empty() {
            return Ok(jar);
        }

        let now = Utc::now();
        let ttl = Duration::seconds(state.config.session_ttl.as_secs() as i64);
        let record = SessionRecord {
            id: self.id,
            data: self.data,
            created_at: self.created_at,
            expires_at: calculate_expiry(now, ttl),
        };
        state.sessions.save_session(&record).await?;

        tracing::debug!(
            session = %record.id,
            state = ?record.data.state(),
            "Saved session"
        );

        let cookie = Cookie::build((state.config.cookie_name.clone(), record.id.to_string()))
            .path("/")
            .http_only(true)
            .secure(state.config.cookie_secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(
                state.config.session_ttl.as_secs() as i64
            ))
            .build();

        Ok(jar.add(cookie))
    }

    /// Delete the stored session and remove the cookie.
    pub async fn destroy(self, state: &AuthState, jar: CookieJar) -> Result<CookieJar, AuthError> {
        if !self.is_new {
            state.sessions.delete_session(&self.id).await?;
            tracing::debug!(session = %self.id, "Deleted session");
        }

        Ok(jar.remove(Cookie::build(state.config.cookie_name.clone()).path("/")))
    }
}

impl<S> FromRequestParts<S> for BrowserSession
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let now = Utc::now();

        let jar = CookieJar::from_headers(&parts.headers);
        let Some(cookie) = jar.get(&auth_state.config.cookie_name) else {
            return Ok(Self::fresh(now));
        };

        let session_id = SessionId::new(cookie.value().to_string());
        let Some(record) = auth_state.sessions.load_session(&session_id).await? else {
            return Ok(Self::fresh(now));
        };

        if is_session_expired(&record, now) {
            auth_state.sessions.delete_session(&record.id).await?;
            return Ok(Self::fresh(now));
        }

        Ok(Self {
            id: record.id,
            loaded: record.data.clone(),
            data: record.data,
            created_at: record.created_at,
            is_new: false,
        })
    }
}

/// Extractor for the signed-in user's claims. Returns 401 if not authenticated.
pub struct CurrentUser(pub UserClaims);

impl<S> FromRequestParts<S> for CurrentUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = BrowserSession::from_request_parts(parts, state)
            .await
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Session lookup failed"))?;

        session
            .data
            .user
            .map(CurrentUser)
            .ok_or((StatusCode::UNAUTHORIZED, "Not authenticated"))
    }
}
