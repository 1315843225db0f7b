//! Serde helper functions for query-string deserialization.
//!
//! Identity providers sometimes send empty parameters (`error=&state=abc`),
//! which should be treated as absent.

use serde::{Deserialize, Deserializer};

/// Deserialize an optional string, treating empty strings as None.
pub fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Params {
        #[serde(default, deserialize_with = "deserialize_optional_string")]
        value: Option<String>,
    }

    #[test]
    fn test_deserialize_optional_string_empty() {
        let params: Params = serde_json::from_str(r#"{"value": ""}"#).unwrap();
        assert_eq!(params.value, None);
    }

    #[test]
    fn test_deserialize_optional_string_whitespace() {
        let params: Params = serde_json::from_str(r#"{"value": "   "}"#).unwrap();
        assert_eq!(params.value, None);
    }

    #[test]
    fn test_deserialize_optional_string_value() {
        let params: Params = serde_json::from_str(r#"{"value": "access_denied"}"#).unwrap();
        assert_eq!(params.value, Some("access_denied".to_string()));
    }

    #[test]
    fn test_deserialize_optional_string_missing() {
        let params: Params = serde_json::from_str("{}").unwrap();
        assert_eq!(params.value, None);
    }
}
