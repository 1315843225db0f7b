//! HTTP handlers for auth routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::CookieJar;
use b2clogin_core::auth::{UserClaims, UserFlow};
use serde::Deserialize;

use crate::error::AuthError;
use crate::extractors::{BrowserSession, CurrentUser};
use crate::{orchestrator, AuthState};

/// Query parameters for the token endpoint.
#[derive(Deserialize, Default)]
pub struct TokenQuery {
    /// Space-separated scopes. Defaults to the configured scopes.
    pub scopes: Option<String>,
}

/// Creates the auth router.
///
/// Routes:
/// - `GET /logout` - End the session here and at the provider
/// - `GET /profile` - Start the profile-edit user flow
/// - `GET /auth/me` - Claims of the signed-in user
/// - `GET /auth/token` - Metadata of a silently acquired access token
pub fn auth_routes() -> Router<AuthState> {
    Router::new()
        .route("/logout", get(logout))
        .route("/profile", get(edit_profile))
        .route("/auth/me", get(me))
        .route("/auth/token", get(token))
}

async fn logout(
    State(state): State<AuthState>,
    mut session: BrowserSession,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AuthError> {
    let logout_url = orchestrator::logout(&state, &mut session.data)?;
    let jar = session.destroy(&state, jar).await?;

    Ok((jar, Redirect::to(logout_url.as_str())))
}

async fn edit_profile(
    State(state): State<AuthState>,
    mut session: BrowserSession,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AuthError> {
    let auth_uri =
        orchestrator::start_login(&state, &mut session.data, UserFlow::EditProfile).await?;
    let jar = session.save(&state, jar).await?;

    Ok((jar, Redirect::to(&auth_uri)))
}

async fn me(CurrentUser(claims): CurrentUser) -> Json<UserClaims> {
    Json(claims)
}

async fn token(
    State(state): State<AuthState>,
    mut session: BrowserSession,
    jar: CookieJar,
    Query(query): Query<TokenQuery>,
) -> Result<Response, AuthError> {
    if !session.data.is_authenticated() {
        return Ok((StatusCode::UNAUTHORIZED, "Not authenticated").into_response());
    }

    let scopes: Vec<String> = match query.scopes {
        Some(scopes) => scopes.split_whitespace().map(String::from).collect(),
        None => state.config.scopes.clone(),
    };

    let result = orchestrator::get_token_silently(&state, &mut session.data, &scopes).await;
    let jar = session.save(&state, jar).await?;

    match result? {
        Some(token) => Ok((jar, Json(token)).into_response()),
        None => Ok((jar, StatusCode::NO_CONTENT).into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::B2cConfig;
    use crate::providers::MockIdentityClient;
    use crate::sessions::InMemorySessionStore;
    use axum::{body::Body, http::Request};
    use b2clogin_core::auth::{SessionId, SessionRecord, SessionRepository, WebSession};
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn setup() -> (Router, Arc<InMemorySessionStore>) {
        let config = B2cConfig::from_lookup(|key| match key {
            "B2C_TENANT" => Some("contoso".to_string()),
            "APP_CLIENT_ID" => Some("client-id".to_string()),
            "APP_CLIENT_SECRET" => Some("secret".to_string()),
            _ => None,
        })
        .unwrap();
        let sessions = Arc::new(InMemorySessionStore::new());
        let state = AuthState::new(
            sessions.clone(),
            Arc::new(MockIdentityClient::new(config.clone())),
            config,
        );

        (auth_routes().with_state(state), sessions)
    }

    async fn seed(sessions: &InMemorySessionStore, data: WebSession) -> String {
        let now = Utc::now();
        let record = SessionRecord {
            id: SessionId::new("seeded-session".to_string()),
            data,
            created_at: now,
            expires_at: now + Duration::hours(1),
        };
        sessions.save_session(&record).await.unwrap();
        format!("b2c_session={}", record.id)
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn signed_in_session() -> WebSession {
        WebSession {
            user: UserClaims::from_value(json!({"sub": "user-1", "name": "Ada"})),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_me_requires_session() {
        let (app, _) = setup();

        let response = app.oneshot(get("/auth/me", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_returns_claims() {
        let (app, sessions) = setup();
        let cookie = seed(&sessions, signed_in_session()).await;

        let response = app.oneshot(get("/auth/me", Some(&cookie))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let claims: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(claims["name"], "Ada");
    }

    #[tokio::test]
    async fn test_logout_deletes_session_and_redirects_to_provider() {
        let (app, sessions) = setup();
        let cookie = seed(&sessions, signed_in_session()).await;

        let response = app.oneshot(get("/logout", Some(&cookie))).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()["location"].to_str().unwrap();
        assert!(location.contains("/oauth2/v2.0/logout"));
        assert!(location.contains("post_logout_redirect_uri="));
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn test_profile_redirects_to_edit_profile_flow() {
        let (app, sessions) = setup();

        let response = app.oneshot(get("/profile", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()["location"].to_str().unwrap();
        assert!(location.contains("/B2C_1_edit_profile/oauth2/v2.0/authorize"));
        assert!(response.headers().contains_key("set-cookie"));
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn test_token_without_cached_account_is_no_content() {
        let (app, sessions) = setup();
        let cookie = seed(&sessions, signed_in_session()).await;

        let response = app.oneshot(get("/auth/token", Some(&cookie))).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_token_requires_sign_in() {
        let (app, _) = setup();

        let response = app.oneshot(get("/auth/token", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
