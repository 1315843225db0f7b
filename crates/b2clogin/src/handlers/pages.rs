//! HTML pages: home, sign-in and the redirect target of the provider.

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use b2clogin_auth::{orchestrator, BrowserSession};
use b2clogin_core::auth::{CallbackOutcome, CallbackParams, UserFlow};

use crate::{error::AppError, state::AppState};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Template wrapper that converts Askama templates into HTML responses.
pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => {
                tracing::error!(error = %err, "Failed to render template");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to render template: {err}"),
                )
                    .into_response()
            }
        }
    }
}

/// Home page of a signed-in user.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    name: String,
    claims: Vec<(String, String)>,
    version: &'static str,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    auth_url: String,
    version: &'static str,
}

/// Error reported by the identity provider on the redirect.
#[derive(Template)]
#[template(path = "auth_error.html")]
pub struct AuthErrorTemplate {
    error: String,
    error_description: Option<String>,
    version: &'static str,
}

/// GET / - home page, or a redirect to /login when nobody is signed in.
pub async fn index(session: BrowserSession) -> Response {
    let Some(user) = session.data.user else {
        return Redirect::to("/login").into_response();
    };

    HtmlTemplate(IndexTemplate {
        name: user.display_name().to_string(),
        claims: user.display_pairs(),
        version: VERSION,
    })
    .into_response()
}

/// GET /login - start a sign-in flow and link to the provider.
pub async fn login(
    State(state): State<AppState>,
    mut session: BrowserSession,
    jar: CookieJar,
) -> Result<(CookieJar, HtmlTemplate<LoginTemplate>), AppError> {
    let auth_url =
        orchestrator::start_login(&state.auth, &mut session.data, UserFlow::SignUpSignIn).await?;
    let jar = session.save(&state.auth, jar).await?;

    Ok((
        jar,
        HtmlTemplate(LoginTemplate {
            auth_url,
            version: VERSION,
        }),
    ))
}

/// GET /getAToken - complete the pending flow.
///
/// The session is saved before looking at the result, so the consumed flow
/// is gone even when the token exchange failed.
pub async fn authorized(
    State(state): State<AppState>,
    mut session: BrowserSession,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AppError> {
    let result = orchestrator::handle_callback(&state.auth, &mut session.data, &params).await;
    let jar = session.save(&state.auth, jar).await?;

    let response = match result? {
        CallbackOutcome::ProviderError(error) => (
            jar,
            HtmlTemplate(AuthErrorTemplate {
                error: error.error,
                error_description: error.error_description,
                version: VERSION,
            }),
        )
            .into_response(),
        CallbackOutcome::Authenticated(_) | CallbackOutcome::ValidationError(_) => {
            (jar, Redirect::to("/")).into_response()
        }
    };

    Ok(response)
}
