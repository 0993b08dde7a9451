//! Message sending and completion assembly.
//!
//! Two forms of the same operation: a blocking form that returns one
//! [`CompletionResult`], and a streaming form that additionally surfaces
//! each answer fragment to a [`ChatSink`] as it arrives. Both build the
//! same threading payload and probe the same set of response shapes.

use super::request::{SendOptions, build_send_body};
use super::sink::{ChatSink, NullSink};
use crate::error::{ChatError, Result};
use crate::models::{CompletionResult, UploadStatus};
use crate::stream::{StreamAccumulator, drive_stream, extract_delta};
use log::debug;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::QwenClient;

/// Reject invalid caller input before any network round trip, including
/// the history read used for parent auto-detection.
fn validate_send(content: &str, options: &SendOptions) -> Result<()> {
    if content.trim().is_empty() {
        return Err(ChatError::Validation("message content is empty".to_string()));
    }
    for file in &options.files {
        if file.status != UploadStatus::Uploaded {
            return Err(ChatError::Validation(format!(
                "attachment '{}' has not been uploaded",
                file.name
            )));
        }
    }
    Ok(())
}

impl QwenClient {
    /// Send a message and wait for the completed result.
    ///
    /// With `options.stream` set (the default) the upstream streams and
    /// the result is assembled internally; with [`SendOptions::buffered`]
    /// a single JSON body is fetched and probed instead.
    pub async fn send_message(
        &self,
        chat_id: &str,
        content: &str,
        options: &SendOptions,
    ) -> Result<CompletionResult> {
        if options.stream {
            let cancel = CancellationToken::new();
            self.send_message_streaming(chat_id, content, options, &cancel, &mut NullSink)
                .await
        } else {
            self.send_buffered(chat_id, content, options).await
        }
    }

    /// Streaming form: each answer fragment reaches `sink` in wire order
    /// before the final result is returned. Cancelling `cancel` closes the
    /// transport read promptly and yields [`ChatError::Cancelled`] — never
    /// a result, never a spurious parse error for the truncation.
    pub async fn send_message_streaming<K: ChatSink>(
        &self,
        chat_id: &str,
        content: &str,
        options: &SendOptions,
        cancel: &CancellationToken,
        sink: &mut K,
    ) -> Result<CompletionResult> {
        validate_send(content, options)?;
        let body = self.prepare_body(chat_id, content, options, true).await?;

        let response = self
            .http()
            .post(self.completions_url(chat_id))
            .headers(self.session().sse_headers()?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Failed before any events: still a stream-transport error,
            // with empty partial buffers.
            let text = response.text().await.unwrap_or_default();
            return Err(ChatError::StreamTransport {
                message: format!("upstream returned {} before any events: {}", status, text),
                partial_content: String::new(),
                partial_reasoning: String::new(),
            });
        }

        let mut acc = StreamAccumulator::new();
        let bytes = Box::pin(response.bytes_stream());
        drive_stream(bytes, &mut acc, cancel, sink).await?;
        Ok(acc.into_result())
    }

    /// Buffered form: one POST, one JSON body, same shape probing as the
    /// stream decoder applied to the top level of the body.
    async fn send_buffered(
        &self,
        chat_id: &str,
        content: &str,
        options: &SendOptions,
    ) -> Result<CompletionResult> {
        validate_send(content, options)?;
        let body = self.prepare_body(chat_id, content, options, false).await?;

        let response = self
            .http()
            .post(self.completions_url(chat_id))
            .headers(self.session().bearer_headers()?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        let value: Value = response.json().await?;
        let delta = extract_delta(&value);
        Ok(CompletionResult {
            content: delta.content.unwrap_or_default(),
            reasoning: delta.reasoning.filter(|r| !r.is_empty()),
        })
    }

    /// Convenience: send to the most recent conversation.
    pub async fn chat(&self, message: &str) -> Result<CompletionResult> {
        let chats = self.list_chats(1).await?;
        let chat = chats.first().ok_or_else(|| {
            ChatError::Validation("no existing conversations; create one first".to_string())
        })?;
        debug!("reusing most recent conversation {}", chat.id);
        self.send_message(&chat.id, message, &SendOptions::new())
            .await
    }

    /// Resolve the parent link and build the outgoing payload.
    async fn prepare_body(
        &self,
        chat_id: &str,
        content: &str,
        options: &SendOptions,
        stream: bool,
    ) -> Result<Value> {
        let parent_id = match &options.parent_id {
            Some(explicit) => Some(explicit.clone()),
            None => self.resolve_parent(chat_id).await,
        };
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.config().model.clone());
        let mut options = options.clone();
        options.stream = stream;
        build_send_body(chat_id, content, parent_id, &model, &options)
    }

    fn completions_url(&self, chat_id: &str) -> String {
        format!(
            "{}?chat_id={}",
            self.session().endpoint("/v2/chat/completions"),
            chat_id
        )
    }
}
