//! The authenticated client and its conversation operations.
//!
//! [`QwenClient`] owns one [`Session`] and one HTTP connection pool. The
//! send paths live in [`send`], payload construction in [`request`], and
//! the incremental-consumer abstraction in [`sink`].

pub mod request;
pub mod send;
pub mod sink;

pub use request::{SendOptions, build_send_body, parent_from_history};
pub use sink::{ChatSink, CollectingSink, FnSink, NullSink};

use crate::auth::Session;
use crate::config::ClientConfig;
use crate::error::{ChatError, Result};
use crate::json_ext::JsonExt;
use crate::models::ChatSummary;
use log::debug;
use serde_json::{Value, json};

/// Client for the upstream chat API.
///
/// One instance per credential. Cheap operations share the connection
/// pool; the only cross-request mutable state is the session token.
#[derive(Debug)]
pub struct QwenClient {
    http: reqwest::Client,
    session: Session,
    config: ClientConfig,
}

impl QwenClient {
    /// Build a client. Fails immediately when the token is empty — a
    /// credential must exist before any network operation.
    ///
    /// No request timeout is set here: deadline policy belongs to the
    /// caller, via the cancellation token passed per request.
    pub fn new(token: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let session = Session::new(token, &config.base_url, &config.user_agent)?;
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            session,
            config,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Replace the bearer credential for all subsequent requests.
    pub fn set_token(&self, token: impl Into<String>) {
        self.session.set_token(token);
    }

    // ------------------------------------------------------------------
    // Shared request plumbing
    // ------------------------------------------------------------------

    pub(crate) async fn get_json(&self, path: &str) -> Result<Value> {
        let response = self
            .http
            .get(self.session.endpoint(path))
            .headers(self.session.bearer_headers()?)
            .send()
            .await?;
        Self::json_or_upstream(response).await
    }

    pub(crate) async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self
            .http
            .post(self.session.endpoint(path))
            .headers(self.session.bearer_headers()?)
            .json(body)
            .send()
            .await?;
        Self::json_or_upstream(response).await
    }

    async fn json_or_upstream(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Most responses wrap their payload in `{"success": bool, "data"}`;
    /// unwrap it when present, pass the body through otherwise.
    fn unwrap_envelope(value: Value) -> Value {
        if value.get_bool_or("success", false)
            && let Some(data) = value.get("data")
        {
            return data.clone();
        }
        value
    }

    fn shape_error(what: &str, err: serde_json::Error) -> ChatError {
        ChatError::Upstream {
            status: 200,
            body: format!("unexpected {} shape: {}", what, err),
        }
    }

    // ------------------------------------------------------------------
    // Auth operations
    // ------------------------------------------------------------------

    /// Fetch a fresh token from the upstream and adopt it for subsequent
    /// requests. Returns the raw auth payload (expiry and user info).
    pub async fn refresh_token(&self) -> Result<Value> {
        let payload = self.get_json("/v1/auths/").await?;
        if let Some(token) = payload.get_str("token") {
            self.session.set_token(token);
            if let Some(expires_at) = payload.get_u64("expires_at") {
                debug!("token refreshed, expires at {}", expires_at);
            }
        }
        Ok(payload)
    }

    /// Current user and token information, without adopting anything.
    pub async fn token_info(&self) -> Result<Value> {
        self.get_json("/v1/auths/").await
    }

    pub async fn user_settings(&self) -> Result<Value> {
        self.get_json("/v2/users/user/settings").await
    }

    pub async fn user_status(&self) -> Result<Value> {
        self.get_json("/v2/users/status").await
    }

    /// Available models and their capabilities, as reported upstream.
    pub async fn list_models(&self) -> Result<Value> {
        self.get_json("/models").await
    }

    // ------------------------------------------------------------------
    // Conversation management
    // ------------------------------------------------------------------

    /// Create a conversation and return its summary.
    pub async fn create_chat(&self, title: &str, model: Option<&str>) -> Result<ChatSummary> {
        let model = model.unwrap_or(&self.config.model);
        let body = json!({
            "title": title,
            "models": [model],
            "chat_mode": "normal",
            "chat_type": "t2t",
            "timestamp": chrono::Utc::now().timestamp_millis(),
        });
        let value = self.post_json("/v2/chats/new", &body).await?;
        serde_json::from_value(Self::unwrap_envelope(value))
            .map_err(|e| Self::shape_error("chat", e))
    }

    /// List conversations, newest first. Pages start at 1.
    pub async fn list_chats(&self, page: u32) -> Result<Vec<ChatSummary>> {
        let value = self.get_json(&format!("/v2/chats/?page={}", page)).await?;
        serde_json::from_value(Self::unwrap_envelope(value))
            .map_err(|e| Self::shape_error("chat listing", e))
    }

    /// Delete a conversation.
    pub async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.session.endpoint(&format!("/v2/chats/{}", chat_id)))
            .headers(self.session.bearer_headers()?)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Full conversation history payload. Also backs parent auto-detection.
    pub async fn chat_history(&self, chat_id: &str) -> Result<Value> {
        self.get_json(&format!("/v2/chats/{}", chat_id)).await
    }

    /// Look up the most recent message id in a conversation. Every
    /// failure mode — network, status, shape — collapses to `None`;
    /// callers must not rely on auto-detection succeeding silently.
    pub(crate) async fn resolve_parent(&self, chat_id: &str) -> Option<String> {
        match self.chat_history(chat_id).await {
            Ok(history) => parent_from_history(&history),
            Err(e) => {
                debug!("parent auto-detection failed for {}: {}", chat_id, e);
                None
            }
        }
    }
}
