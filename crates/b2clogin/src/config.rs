use std::env;

/// Deployment settings of the binary, loaded from environment variables.
///
/// B2C settings live in [`b2clogin_auth::B2cConfig`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite session database (default: "b2clogin.db")
    /// Note: Only used when the `sessions-sqlite` feature is enabled.
    #[allow(dead_code)]
    pub sqlite_path: String,
    /// Redis connection URL (default: "redis://localhost:6379")
    /// Note: Only used when the `sessions-redis` feature is enabled.
    #[allow(dead_code)]
    pub redis_url: String,
    /// Port of the mock IdP (default: 3001)
    /// Note: Only used when the `auth-mock` feature is enabled.
    #[allow(dead_code)]
    pub mock_idp_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SQLITE_PATH` - SQLite database path (default: "b2clogin.db")
    /// - `REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    /// - `MOCK_IDP_PORT` - Mock IdP port (default: 3001)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            sqlite_path: lookup("SQLITE_PATH").unwrap_or_else(|| "b2clogin.db".to_string()),
            redis_url: lookup("REDIS_URL")
                .unwrap_or_else(|| "redis://localhost:6379".to_string()),
            mock_idp_port: lookup("MOCK_IDP_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3001),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::from_lookup(|_| None);

        assert_eq!(config.sqlite_path, "b2clogin.db");
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.mock_idp_port, 3001);
    }

    #[test]
    fn test_invalid_port_falls_back_to_default() {
        let config = Config::from_lookup(|key| match key {
            "MOCK_IDP_PORT" => Some("not-a-port".to_string()),
            "SQLITE_PATH" => Some("/tmp/sessions.db".to_string()),
            _ => None,
        });

        assert_eq!(config.mock_idp_port, 3001);
        assert_eq!(config.sqlite_path, "/tmp/sessions.db");
    }
}
