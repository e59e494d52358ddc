//! Redaction of sensitive values from query argument payloads.
//!
//! Query logs persist the arguments of slow or failed operations. Any value
//! whose key contains a sensitive substring (case-insensitive) is replaced
//! with `"[REDACTED]"` before the payload leaves the process boundary.

use serde_json::Value;

/// Key substrings that mark a value as sensitive.
const SENSITIVE_KEYS: &[&str] = &["password", "token", "secret", "key", "auth", "authorization"];

/// Replacement literal for redacted values.
pub const REDACTED: &str = "[REDACTED]";

/// Returns a deep copy of `args` with sensitive values redacted.
///
/// Traverses objects and arrays recursively. A value is redacted when its
/// key, lowercased, contains any of the sensitive substrings; the entire
/// value (scalar or subtree) is replaced with [`REDACTED`]. Scalars and
/// `null` at the top level pass through unchanged.
#[must_use]
pub fn sanitize_params(args: &Value) -> Value {
    match args {
        Value::Object(map) => {
            let mut result = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                let lower = key.to_lowercase();
                if SENSITIVE_KEYS.iter().any(|s| lower.contains(s)) {
                    result.insert(key.clone(), Value::String(REDACTED.to_string()));
                } else {
                    result.insert(key.clone(), sanitize_params(value));
                }
            }
            Value::Object(result)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_params).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_sensitive_keys() {
        let input = json!({"password": "hunter2", "name": "alice"});
        let output = sanitize_params(&input);
        assert_eq!(output, json!({"password": REDACTED, "name": "alice"}));
    }

    #[test]
    fn redacts_nested_objects() {
        let input = json!({
            "data": {
                "apiToken": "abc123",
                "profile": {"authHeader": "Bearer xyz", "city": "Lisbon"}
            }
        });
        let output = sanitize_params(&input);
        assert_eq!(
            output,
            json!({
                "data": {
                    "apiToken": REDACTED,
                    "profile": {"authHeader": REDACTED, "city": "Lisbon"}
                }
            })
        );
    }

    #[test]
    fn redacts_inside_arrays() {
        let input = json!({"items": [{"secretValue": 42}, {"count": 7}]});
        let output = sanitize_params(&input);
        assert_eq!(
            output,
            json!({"items": [{"secretValue": REDACTED}, {"count": 7}]})
        );
    }

    #[test]
    fn key_match_is_case_insensitive_substring() {
        let input = json!({"UserPassword": "x", "MONKEY": "kept", "sessionKey": "y"});
        let output = sanitize_params(&input);
        // "MONKEY" contains "key" as a substring, so it is redacted too.
        assert_eq!(
            output,
            json!({"UserPassword": REDACTED, "MONKEY": REDACTED, "sessionKey": REDACTED})
        );
    }

    #[test]
    fn non_sensitive_payload_is_untouched() {
        let input = json!({"matchId": "m-1", "participants": 4, "tags": ["a", "b"]});
        assert_eq!(sanitize_params(&input), input);
    }

    #[test]
    fn scalars_and_null_pass_through() {
        assert_eq!(sanitize_params(&Value::Null), Value::Null);
        assert_eq!(sanitize_params(&json!(5)), json!(5));
        assert_eq!(sanitize_params(&json!("text")), json!("text"));
    }
}
