use chrono::{DateTime, Duration, Utc};
use rand::{distr::Alphanumeric, Rng};

use super::{AuthCodeFlow, SessionId, SessionRecord};

/// How long a pending authorization-code flow stays usable.
pub fn flow_max_age() -> Duration {
    Duration::minutes(10)
}

/// Generate a random alphanumeric token for state and nonce values.
pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Generate a cryptographically random session ID.
pub fn generate_session_id() -> SessionId {
    SessionId::new(generate_state())
}

/// Check if a session has expired.
pub fn is_session_expired(session: &SessionRecord, now: DateTime<Utc>) -> bool {
    session.expires_at <= now
}

/// Check if a pending flow is too old to be completed.
pub fn is_flow_expired(flow: &AuthCodeFlow, now: DateTime<Utc>, max_age: Duration) -> bool {
    flow.created_at + max_age <= now
}

/// Calculate session expiry from a reference time and TTL.
///
/// Saturates at the latest representable time instead of overflowing.
pub fn calculate_expiry(from: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    from.checked_add_signed(ttl)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
