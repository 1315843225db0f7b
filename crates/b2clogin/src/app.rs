use axum::{routing::get, Router};
use b2clogin_auth::{auth_routes, REDIRECT_PATH};
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{
        health::livez,
        pages::{authorized, index, login},
    },
    state::AppState,
};

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login))
        .route(REDIRECT_PATH, get(authorized))
        .route("/livez", get(livez))
        .merge(auth_routes().with_state(state.auth.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, Response, StatusCode},
    };
    use b2clogin_auth::{
        encode_mock_code, AuthState, B2cConfig, InMemorySessionStore, MockIdentityClient,
    };
    use b2clogin_core::auth::{SessionId, SessionRecord, SessionRepository};
    use http_body_util::BodyExt;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;
    use url::Url;

    struct TestApp {
        app: Router,
        sessions: Arc<InMemorySessionStore>,
    }

    impl TestApp {
        fn new() -> Self {
            let config = B2cConfig::from_lookup(|key| match key {
                "B2C_TENANT" => Some("contoso".to_string()),
                "APP_CLIENT_ID" => Some("client-id".to_string()),
                "APP_CLIENT_SECRET" => Some("secret".to_string()),
                _ => None,
            })
            .unwrap();
            let sessions = Arc::new(InMemorySessionStore::new());
            let auth = AuthState::new(
                sessions.clone(),
                Arc::new(MockIdentityClient::new(config.clone())),
                config,
            );

            Self {
                app: create_app(AppState::new(auth)),
                sessions,
            }
        }

        async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
            let mut builder = Request::builder().uri(uri);
            if let Some(cookie) = cookie {
                builder = builder.header("cookie", cookie);
            }
            self.app
                .clone()
                .oneshot(builder.body(Body::empty()).unwrap())
                .await
                .unwrap()
        }

        async fn session(&self, cookie: &str) -> Option<SessionRecord> {
            let id = cookie.trim_start_matches("b2c_session=");
            self.sessions
                .load_session(&SessionId::new(id.to_string()))
                .await
                .unwrap()
        }

        /// GET /login and return the session cookie.
        async fn start_login(&self) -> String {
            let response = self.get("/login", None).await;
            assert_eq!(response.status(), StatusCode::OK);
            session_cookie(&response).expect("login sets the session cookie")
        }

        /// Callback query a mock provider would send for the pending flow.
        async fn callback_query(&self, cookie: &str) -> String {
            let flow = self.session(cookie).await.unwrap().data.flow.unwrap();
            let code = encode_mock_code(
                &json!({
                    "sub": "user-1",
                    "oid": "user-1",
                    "name": "Ada Lovelace",
                    "emails": ["ada@contoso.com"],
                }),
                &flow.nonce,
            );
            let mut url = Url::parse("http://localhost/getAToken").unwrap();
            url.query_pairs_mut()
                .append_pair("code", &code)
                .append_pair("state", &flow.state);
            format!("{}?{}", url.path(), url.query().unwrap())
        }

        async fn sign_in(&self) -> String {
            let cookie = self.start_login().await;
            let query = self.callback_query(&cookie).await;
            let response = self.get(&query, Some(&cookie)).await;
            assert_eq!(location(&response), "/");
            cookie
        }
    }

    fn session_cookie(response: &Response<Body>) -> Option<String> {
        response
            .headers()
            .get("set-cookie")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .filter(|v| v.starts_with("b2c_session="))
            .map(String::from)
    }

    fn location(response: &Response<Body>) -> &str {
        response.headers()["location"].to_str().unwrap()
    }

    async fn body_text(response: Response<Body>) -> String {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_index_redirects_anonymous_to_login() {
        let app = TestApp::new();

        let response = app.get("/", None).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
        assert!(app.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn test_login_stores_flow_and_links_to_authority() {
        let app = TestApp::new();

        let response = app.get("/login", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response).unwrap();
        let set_cookie = response.headers()["set-cookie"].to_str().unwrap();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));

        let html = body_text(response).await;
        assert!(html.contains(
            "https://contoso.b2clogin.com/contoso.onmicrosoft.com/B2C_1_susi/oauth2/v2.0/authorize"
        ));

        let session = app.session(&cookie).await.unwrap();
        assert!(session.data.flow.is_some());
        assert!(session.data.user.is_none());
    }

    #[tokio::test]
    async fn test_callback_without_flow_redirects_home() {
        let app = TestApp::new();

        let response = app.get("/getAToken?code=abc&state=xyz", None).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        assert!(session_cookie(&response).is_none());
        assert!(app.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn test_successful_callback_signs_in() {
        let app = TestApp::new();
        let cookie = app.start_login().await;
        let query = app.callback_query(&cookie).await;

        let response = app.get(&query, Some(&cookie)).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        let session = app.session(&cookie).await.unwrap();
        assert_eq!(session.data.user.unwrap().display_name(), "Ada Lovelace");
        assert!(session.data.flow.is_none());
        assert!(session.data.token_cache.is_some());

        let response = app.get("/", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Welcome Ada Lovelace!"));
        assert!(html.contains("ada@contoso.com"));
    }

    #[tokio::test]
    async fn test_provider_error_renders_error_view() {
        let app = TestApp::new();
        let cookie = app.start_login().await;
        let flow = app.session(&cookie).await.unwrap().data.flow.unwrap();

        let response = app
            .get(
                &format!(
                    "/getAToken?error=access_denied&error_description=AADB2C90091%3A+cancelled&state={}",
                    flow.state
                ),
                Some(&cookie),
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("access_denied"));
        assert!(html.contains("AADB2C90091: cancelled"));

        let session = app.session(&cookie).await.unwrap();
        assert!(session.data.user.is_none());
        assert!(session.data.flow.is_none());
    }

    #[tokio::test]
    async fn test_replayed_callback_fails_validation() {
        let app = TestApp::new();
        let cookie = app.start_login().await;
        let query = app.callback_query(&cookie).await;
        let flow = app.session(&cookie).await.unwrap().data.flow.unwrap();

        // Consume the flow with a provider error, then replay a valid code.
        app.get(
            &format!("/getAToken?error=access_denied&state={}", flow.state),
            Some(&cookie),
        )
        .await;
        let response = app.get(&query, Some(&cookie)).await;

        assert_eq!(location(&response), "/");
        let session = app.session(&cookie).await.unwrap();
        assert!(session.data.user.is_none());
    }

    #[tokio::test]
    async fn test_forged_state_is_ignored() {
        let app = TestApp::new();
        let cookie = app.start_login().await;
        let genuine = app.callback_query(&cookie).await;

        let response = app
            .get("/getAToken?code=abc&state=forged", Some(&cookie))
            .await;

        assert_eq!(location(&response), "/");
        let session = app.session(&cookie).await.unwrap();
        assert!(session.data.user.is_none());
        assert!(session.data.flow.is_some());

        let response = app.get(&genuine, Some(&cookie)).await;

        assert_eq!(location(&response), "/");
        assert!(app.session(&cookie).await.unwrap().data.user.is_some());
    }

    #[tokio::test]
    async fn test_logout_clears_session_and_redirects_to_provider() {
        let app = TestApp::new();
        let cookie = app.sign_in().await;

        let response = app.get("/logout", Some(&cookie)).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let logout = Url::parse(location(&response)).unwrap();
        assert_eq!(
            logout.path(),
            "/contoso.onmicrosoft.com/B2C_1_susi/oauth2/v2.0/logout"
        );
        let (key, value) = logout.query_pairs().next().unwrap();
        assert_eq!(key, "post_logout_redirect_uri");
        assert_eq!(Url::parse(&value).unwrap().path(), "/");

        assert!(app.session(&cookie).await.is_none());
        let response = app.get("/", Some(&cookie)).await;
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn test_token_from_cache_leaves_session_untouched() {
        let app = TestApp::new();
        let cookie = app.sign_in().await;
        let before = app.session(&cookie).await.unwrap();

        let response = app.get("/auth/token", Some(&cookie)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(session_cookie(&response).is_none());
        let token: serde_json::Value =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(token["from_cache"], true);
        assert!(token.get("access_token").is_none());

        let after = app.session(&cookie).await.unwrap();
        assert_eq!(after.data.token_cache, before.data.token_cache);
        assert_eq!(after.expires_at, before.expires_at);
    }

    #[tokio::test]
    async fn test_expired_session_is_treated_as_anonymous() {
        let app = TestApp::new();
        let cookie = app.sign_in().await;
        let mut session = app.session(&cookie).await.unwrap();
        session.expires_at = chrono::Utc::now() - chrono::Duration::minutes(1);
        app.sessions.save_session(&session).await.unwrap();

        let response = app.get("/", Some(&cookie)).await;

        assert_eq!(location(&response), "/login");
        assert!(app.session(&cookie).await.is_none());
    }

    #[tokio::test]
    async fn test_livez() {
        let app = TestApp::new();

        let response = app.get("/livez", None).await;

        assert_eq!(response.status(), StatusCode::OK);
    }
}
