use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors of the b2clogin_auth crate.
///
/// Wraps the core `AuthError` and adds configuration failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Error from the core auth module (token cache, storage, code exchange)
    #[error(transparent)]
    Core(#[from] b2clogin_core::auth::AuthError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        use b2clogin_core::auth::AuthError as CoreError;

        let (status, message) = match &self {
            AuthError::Core(core_err) => match core_err {
                CoreError::CodeExchange(_) | CoreError::TokenRefresh(_) | CoreError::Provider(_) => {
                    tracing::error!(error = %self, "Identity provider error");
                    (
                        StatusCode::BAD_GATEWAY,
                        "Authentication provider error".to_string(),
                    )
                }
                CoreError::TokenCache(_) | CoreError::Storage(_) => {
                    tracing::error!(error = %self, "Auth error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
            AuthError::Config(_) => {
                tracing::error!(error = %self, "Config error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server configuration error".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use b2clogin_core::auth::AuthError as CoreError;

    #[test]
    fn provider_failures_map_to_bad_gateway() {
        let response = AuthError::Core(CoreError::CodeExchange("reset".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = AuthError::Core(CoreError::Provider("dns".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn storage_failure_maps_to_internal_error() {
        let response = AuthError::Core(CoreError::Storage("locked".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn config_error_keeps_message() {
        let error = AuthError::from(ConfigError::MissingVar("B2C_TENANT"));
        assert_eq!(
            error.to_string(),
            "Need to define B2C_TENANT environment variable"
        );
    }
}
