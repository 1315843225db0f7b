//! Health check endpoint.

use axum::http::StatusCode;

/// GET /livez - Basic liveness probe.
///
/// Returns 200 immediately. Does not contact the identity provider or the
/// session store.
pub async fn livez() -> StatusCode {
    StatusCode::OK
}
