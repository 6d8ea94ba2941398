//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::time::Duration;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default TTL in milliseconds for entries without explicit TTL, 0 = never expire
    pub default_ttl_ms: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl_ms: parse_var("DEFAULT_TTL_MS").unwrap_or(defaults.default_ttl_ms),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    /// Default TTL as a duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl_ms: 300_000,
            server_port: 3000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.default_ttl_ms, 300_000);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.default_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("DEFAULT_TTL_MS");
        env::remove_var("SERVER_PORT");

        let config = Config::from_env();
        assert_eq!(config.default_ttl_ms, 300_000);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        env::set_var("LOOKASIDE_TEST_GARBAGE", "not-a-number");
        assert_eq!(parse_var::<u16>("LOOKASIDE_TEST_GARBAGE"), None);

        env::set_var("LOOKASIDE_TEST_PORT", " 8080 ");
        assert_eq!(parse_var::<u16>("LOOKASIDE_TEST_PORT"), Some(8080));
    }
}
