//! Mock IdP server for development and testing.
//!
//! Simulates the B2C authorize and logout endpoints under
//! `/{tenant}/{user_flow}/oauth2/v2.0/`, issuing codes that
//! `MockIdentityClient` understands.

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use url::Url;

use super::templates::{self, LoginPage};
use crate::providers::encode_mock_code;

#[derive(Deserialize)]
struct AuthorizeQuery {
    client_id: String,
    state: String,
    nonce: String,
    redirect_uri: String,
}

#[derive(Deserialize)]
struct LogoutQuery {
    post_logout_redirect_uri: String,
}

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    email: String,
    name: Option<String>,
    user_flow: String,
    client_id: String,
    state: String,
    nonce: String,
    redirect_uri: String,
    action: String,
}

/// Mock IdP server that simulates B2C user flow endpoints.
pub struct MockIdpServer {
    port: u16,
}

impl MockIdpServer {
    /// Create a new Mock IdP server.
    ///
    /// # Arguments
    /// * `port` - The port to listen on (typically 3001)
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    /// Routes:
    /// - `GET /{tenant}/{user_flow}/oauth2/v2.0/authorize` - Login page
    /// - `POST /authorize/submit` - Form submission handler
    /// - `GET /{tenant}/{user_flow}/oauth2/v2.0/logout` - Redirects to the post-logout URI
    pub fn router() -> Router {
        Router::new()
            .route("/{tenant}/{user_flow}/oauth2/v2.0/authorize", get(authorize))
            .route("/authorize/submit", post(authorize_submit))
            .route("/{tenant}/{user_flow}/oauth2/v2.0/logout", get(logout))
    }

    /// Run the Mock IdP server.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        tracing::info!("Mock IdP server listening on http://{}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, Self::router()).await
    }
}

async fn authorize(
    Path((_tenant, user_flow)): Path<(String, String)>,
    Query(params): Query<AuthorizeQuery>,
) -> Html<String> {
    Html(templates::login_page(&LoginPage {
        user_flow: &user_flow,
        client_id: &params.client_id,
        state: &params.state,
        nonce: &params.nonce,
        redirect_uri: &params.redirect_uri,
    }))
}

async fn authorize_submit(Form(form): Form<LoginForm>) -> Response {
    let Ok(mut callback_url) = Url::parse(&form.redirect_uri) else {
        return (StatusCode::BAD_REQUEST, "Invalid redirect_uri").into_response();
    };

    if form.action == "cancel" {
        // B2C reports a cancelled user flow as access_denied with code AADB2C90091.
        callback_url
            .query_pairs_mut()
            .append_pair("error", "access_denied")
            .append_pair(
                "error_description",
                "AADB2C90091: The user has cancelled entering self-asserted information.",
            )
            .append_pair("state", &form.state);
        return Redirect::to(callback_url.as_str()).into_response();
    }

    if form.email.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Email is required").into_response();
    }

    let object_id = format!("mock-{}", form.email);
    let name = form
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| form.email.clone());
    let claims = json!({
        "iss": "http://localhost:3001/mock/v2.0/",
        "aud": form.client_id,
        "sub": object_id,
        "oid": object_id,
        "name": name,
        "emails": [form.email],
        "tfp": form.user_flow,
    });

    callback_url
        .query_pairs_mut()
        .append_pair("code", &encode_mock_code(&claims, &form.nonce))
        .append_pair("state", &form.state);

    Redirect::to(callback_url.as_str()).into_response()
}

async fn logout(Query(params): Query<LogoutQuery>) -> Response {
    Redirect::to(&params.post_logout_redirect_uri).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn submit(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/authorize/submit")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_authorize_renders_login_page() {
        let response = MockIdpServer::router()
            .oneshot(
                Request::builder()
                    .uri("/contoso.onmicrosoft.com/B2C_1_susi/oauth2/v2.0/authorize?client_id=c&state=s1&nonce=n1&redirect_uri=http%3A%2F%2Flocalhost%3A5000%2FgetAToken&scope=openid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("B2C_1_susi"));
        assert!(html.contains("value=\"s1\""));
    }

    #[tokio::test]
    async fn test_submit_redirects_with_code_and_state() {
        let response = MockIdpServer::router()
            .oneshot(submit(
                "email=ada%40contoso.com&name=Ada&user_flow=B2C_1_susi&client_id=c&state=s1&nonce=n1&redirect_uri=http%3A%2F%2Flocalhost%3A5000%2FgetAToken&action=submit",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = Url::parse(response.headers()["location"].to_str().unwrap()).unwrap();
        assert_eq!(location.path(), "/getAToken");
        let query: Vec<(String, String)> = location.query_pairs().into_owned().collect();
        assert!(query.iter().any(|(k, _)| k == "code"));
        assert!(query.contains(&("state".to_string(), "s1".to_string())));
    }

    #[tokio::test]
    async fn test_cancel_redirects_with_error() {
        let response = MockIdpServer::router()
            .oneshot(submit(
                "user_flow=B2C_1_susi&client_id=c&state=s1&nonce=n1&redirect_uri=http%3A%2F%2Flocalhost%3A5000%2FgetAToken&action=cancel",
            ))
            .await
            .unwrap();

        let location = Url::parse(response.headers()["location"].to_str().unwrap()).unwrap();
        let query: Vec<(String, String)> = location.query_pairs().into_owned().collect();
        assert!(query.contains(&("error".to_string(), "access_denied".to_string())));
    }

    #[tokio::test]
    async fn test_logout_follows_post_logout_redirect() {
        let response = MockIdpServer::router()
            .oneshot(
                Request::builder()
                    .uri("/contoso.onmicrosoft.com/B2C_1_susi/oauth2/v2.0/logout?post_logout_redirect_uri=http%3A%2F%2Flocalhost%3A5000%2F")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["location"], "http://localhost:5000/");
    }
}
