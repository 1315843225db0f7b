//! Functional core for b2clogin.
//!
//! Pure types and functions shared by the auth crate and the web binary:
//! the typed browser session, the authorization-code flow descriptor, the
//! serializable token cache and the traits at the I/O seams.

pub mod auth;
pub mod serde;
