//! Mock B2C identity provider for local development.
//!
//! Serves the authorize and logout endpoints of any tenant and user flow so
//! the full login round trip works without a real B2C tenant.

mod server;
mod templates;

pub use server::MockIdpServer;
