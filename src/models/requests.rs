//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use std::time::Duration;

use serde::Deserialize;

/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Validates a key taken from the request path.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        ));
    }
    None
}

/// Request body for the SET operation (PUT /cache/:key)
///
/// # Fields
/// - `value`: The value to store
/// - `ttl_ms`: Optional TTL in milliseconds; missing, zero or negative uses the default
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The value to store
    pub value: String,
    /// Optional TTL in milliseconds
    #[serde(default)]
    pub ttl_ms: Option<i64>,
}

impl SetRequest {
    /// TTL to hand to the cache, `Duration::ZERO` selecting the default.
    pub fn ttl(&self) -> Duration {
        match self.ttl_ms {
            Some(ms) if ms > 0 => Duration::from_millis(ms as u64),
            _ => Duration::ZERO,
        }
    }
}

/// Query string for GET /cache
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeysQuery {
    /// Also list entries that have expired but were not yet removed
    #[serde(default)]
    pub include_expired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"value": "hello"}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.value, "hello");
        assert!(req.ttl_ms.is_none());
        assert_eq!(req.ttl(), Duration::ZERO);
    }

    #[test]
    fn test_set_request_with_ttl() {
        let json = r#"{"value": "hello", "ttl_ms": 1500}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl(), Duration::from_millis(1500));
    }

    #[test]
    fn test_negative_ttl_uses_default() {
        let json = r#"{"value": "hello", "ttl_ms": -20}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl(), Duration::ZERO);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("").is_some());
        assert!(validate_key(&"x".repeat(MAX_KEY_LENGTH + 1)).is_some());
        assert!(validate_key("valid_key").is_none());
    }
}
