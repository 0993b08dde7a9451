//! Client configuration.
//!
//! Only the knobs the client itself needs live here: the upstream base
//! URL, the default model, and the user agent presented to the upstream.
//! Timeout and retry policy deliberately do not appear — the core honors
//! an externally supplied cancellation signal instead of owning deadlines.

use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};

/// Default upstream endpoint root.
pub const DEFAULT_BASE_URL: &str = "https://chat.qwen.ai/api";

/// Model used when the caller does not name one.
pub const DEFAULT_MODEL: &str = "qwen3-max";

/// The upstream rejects non-browser user agents intermittently, so the
/// client presents a browser-like one by default.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Environment variable overriding the base URL.
const BASE_URL_ENV: &str = "QWEN_API_URL";

/// Configuration for a [`crate::QwenClient`] instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Upstream endpoint root, without a trailing slash.
    pub base_url: String,
    /// Default model identifier for sends that do not specify one.
    pub model: String,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults, with the base URL taken from `QWEN_API_URL` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(BASE_URL_ENV)
            && !url.trim().is_empty()
        {
            config.base_url = url;
        }
        config
    }

    /// Parse a config from TOML text. Missing fields fall back to defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ChatError::Validation(format!("invalid config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = ClientConfig::from_toml_str("model = \"qwen-plus\"").unwrap();
        assert_eq!(config.model, "qwen-plus");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_from_toml_invalid() {
        let err = ClientConfig::from_toml_str("model = [1, 2]").unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }
}
