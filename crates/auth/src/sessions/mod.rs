//! Session storage implementations.
//!
//! Provides `SessionRepository` implementations for:
//! - In-memory (always available, the default backend)
//! - SQLite (with `sqlite` feature)
//! - Redis (with `redis` feature)

mod inmemory;
#[cfg(feature = "redis")]
mod redis_impl;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use inmemory::InMemorySessionStore;
#[cfg(feature = "redis")]
pub use redis_impl::RedisSessionStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSessionStore;
