//! Session credential holder.
//!
//! A [`Session`] owns the bearer token and the endpoint root for one
//! client instance. Headers are derived from the current token on every
//! request — there is no cached header snapshot to go stale — and token
//! replacement is atomic with respect to concurrent derivations: a reader
//! sees either the old or the new credential in full. Requests already in
//! flight keep the headers they captured at their own start.

use crate::error::{ChatError, Result};
use reqwest::header::{
    ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT,
};
use std::sync::{PoisonError, RwLock};
use url::Url;

/// Authenticated session state for one client.
#[derive(Debug)]
pub struct Session {
    token: RwLock<String>,
    base_url: String,
    user_agent: String,
}

impl Session {
    /// Create a session. An empty or whitespace-only token is rejected
    /// immediately so that no network operation can run unauthenticated.
    pub fn new(
        token: impl Into<String>,
        base_url: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ChatError::Authentication(
                "a bearer token is required".to_string(),
            ));
        }
        let base_url: String = base_url.into();
        if Url::parse(&base_url).is_err() {
            return Err(ChatError::Validation(format!(
                "invalid base URL: {}",
                base_url
            )));
        }
        Ok(Self {
            token: RwLock::new(token),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
        })
    }

    /// Replace the credential. Affects every request issued afterwards;
    /// has no effect on requests already in flight.
    pub fn set_token(&self, token: impl Into<String>) {
        let mut slot = self
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = token.into();
    }

    /// Snapshot of the current token.
    pub fn token(&self) -> String {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Endpoint root, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path (`path` must start with `/`).
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Derive the request headers from the current token.
    ///
    /// A token that cannot be encoded as a header value is an
    /// authentication error, not a transport one.
    pub fn bearer_headers(&self) -> Result<HeaderMap> {
        let token = self.token();
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            ChatError::Authentication("token contains characters invalid in a header".to_string())
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let agent = HeaderValue::from_str(&self.user_agent).map_err(|_| {
            ChatError::Authentication("user agent is not a valid header value".to_string())
        })?;
        headers.insert(USER_AGENT, agent);
        Ok(headers)
    }

    /// Headers for a streaming request: the bearer set plus the SSE
    /// negotiation fields the upstream expects.
    pub fn sse_headers(&self) -> Result<HeaderMap> {
        let mut headers = self.bearer_headers()?;
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        headers.insert(
            HeaderName::from_static("x-accel-buffering"),
            HeaderValue::from_static("no"),
        );
        headers.insert(
            HeaderName::from_static("source"),
            HeaderValue::from_static("web"),
        );
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(token: &str) -> Session {
        Session::new(token, "https://chat.example/api/", "test-agent").unwrap()
    }

    #[test]
    fn test_empty_token_rejected() {
        let err = Session::new("  ", "https://chat.example/api", "ua").unwrap_err();
        assert!(matches!(err, ChatError::Authentication(_)));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = Session::new("tok", "not a url", "ua").unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let s = session("tok");
        assert_eq!(s.endpoint("/v2/chats/"), "https://chat.example/api/v2/chats/");
    }

    #[test]
    fn test_headers_follow_rotation() {
        let s = session("alpha");
        let before = s.bearer_headers().unwrap();
        assert_eq!(before[AUTHORIZATION], "Bearer alpha");

        s.set_token("beta");
        let after = s.bearer_headers().unwrap();
        assert_eq!(after[AUTHORIZATION], "Bearer beta");
        // The snapshot captured before rotation is unchanged.
        assert_eq!(before[AUTHORIZATION], "Bearer alpha");
    }

    #[test]
    fn test_invalid_token_bytes() {
        let s = session("ok");
        s.set_token("bad\ntoken");
        assert!(matches!(
            s.bearer_headers(),
            Err(ChatError::Authentication(_))
        ));
    }

    #[test]
    fn test_sse_headers_extend_bearer_set() {
        let s = session("tok");
        let headers = s.sse_headers().unwrap();
        assert_eq!(headers[ACCEPT], "text/event-stream");
        assert_eq!(headers["x-accel-buffering"], "no");
        assert_eq!(headers["source"], "web");
        assert_eq!(headers[AUTHORIZATION], "Bearer tok");
    }
}
