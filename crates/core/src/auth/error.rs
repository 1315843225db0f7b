use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to exchange authorization code: {0}")]
    CodeExchange(String),

    #[error("failed to refresh token: {0}")]
    TokenRefresh(String),

    #[error("token cache error: {0}")]
    TokenCache(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("provider error: {0}")]
    Provider(String),
}
