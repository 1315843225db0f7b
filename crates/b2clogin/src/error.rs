use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Application error type that wraps `anyhow::Error`.
///
/// Handlers return `Result<_, AppError>` and use `?` on anything that
/// converts into `anyhow::Error`. Auth errors keep their own status codes.
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.0.downcast::<b2clogin_auth::AuthError>() {
            Ok(auth_error) => auth_error.into_response(),
            Err(error) => {
                tracing::error!(error = %error, "Application error");

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Something went wrong: {}", error),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
