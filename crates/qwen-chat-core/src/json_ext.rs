//! JSON value extraction helpers.
//!
//! The upstream API is loosely typed: most responses are probed rather
//! than deserialized into fixed structs. This trait keeps the probing
//! readable by collapsing `.get().and_then()` chains.

use serde_json::Value;

/// Extension trait for JSON value extraction
pub trait JsonExt {
    /// Get a string field, `None` if the key is missing or not a string
    fn get_str(&self, key: &str) -> Option<&str>;

    /// Get a bool field with a default (commonly `false`)
    fn get_bool_or(&self, key: &str, default: bool) -> bool;

    /// Get a u64 field, `None` if the key is missing or not a number
    fn get_u64(&self, key: &str) -> Option<u64>;

    /// Get an array field, `None` if the key is missing or not an array
    fn get_array(&self, key: &str) -> Option<&Vec<Value>>;
}

impl JsonExt for Value {
    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.as_u64())
    }

    fn get_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.get(key).and_then(|v| v.as_array())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_str() {
        let v = json!({"currentId": "m1", "page": 2});
        assert_eq!(v.get_str("currentId"), Some("m1"));
        assert_eq!(v.get_str("missing"), None);
        assert_eq!(v.get_str("page"), None); // not a string
    }

    #[test]
    fn test_get_bool_or() {
        let v = json!({"success": true});
        assert!(v.get_bool_or("success", false));
        assert!(!v.get_bool_or("missing", false));
    }

    #[test]
    fn test_get_u64() {
        let v = json!({"expires_at": 1750000000u64, "id": "x"});
        assert_eq!(v.get_u64("expires_at"), Some(1750000000));
        assert_eq!(v.get_u64("id"), None);
    }

    #[test]
    fn test_get_array() {
        let v = json!({"choices": [{"delta": {}}]});
        assert_eq!(v.get_array("choices").map(|a| a.len()), Some(1));
        assert!(v.get_array("missing").is_none());
    }
}
