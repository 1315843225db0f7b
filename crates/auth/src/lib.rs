//! Azure AD B2C authentication for b2clogin.
//!
//! This crate provides:
//! - B2C configuration loaded from the environment
//! - The authorization-code flow over a browser session (`orchestrator`)
//! - An `openidconnect`-backed identity client and a mock for development
//! - Session storage (in-memory, SQLite or Redis via feature flags)
//! - Axum extractors and routes

mod config;
mod error;
mod extractors;
mod handlers;
pub mod orchestrator;
mod providers;
mod sessions;
mod state;

pub use config::{B2cConfig, ConfigError, REDIRECT_PATH};
pub use error::AuthError;
pub use extractors::{BrowserSession, CurrentUser};
pub use handlers::auth_routes;
pub use providers::B2cClient;
#[cfg(any(test, feature = "mock"))]
pub use providers::{encode_mock_code, MockIdentityClient};
pub use sessions::InMemorySessionStore;
#[cfg(feature = "redis")]
pub use sessions::RedisSessionStore;
#[cfg(feature = "sqlite")]
pub use sessions::SqliteSessionStore;
pub use state::AuthState;

#[cfg(any(test, feature = "mock"))]
pub mod mock_idp;
