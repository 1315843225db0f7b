mod error;
mod functions;
mod session;
mod token_cache;
mod traits;
mod types;

pub use error::AuthError;
pub use functions::{
    calculate_expiry, flow_max_age, generate_session_id, generate_state, is_flow_expired,
    is_session_expired,
};
pub use session::{SessionId, SessionRecord, SessionState, WebSession};
pub use token_cache::{CachedAccessToken, TokenCache};
pub use traits::{IdentityClient, Result, SessionRepository};
pub use types::{
    Account, AuthCodeFlow, CallbackOutcome, CallbackParams, ProviderError, TokenResult,
    UserClaims, UserFlow,
};
