//! Streaming response decoding and accumulation.
//!
//! The upstream interleaves two logical channels in one SSE stream: the
//! visible answer and an optional reasoning/thinking trace. The two use
//! different accumulation semantics — answer deltas are incremental
//! fragments and are appended, while reasoning arrives as cumulative
//! snapshots and replaces the previous value. Event order is therefore
//! load-bearing and is preserved exactly as received on the wire.

use crate::api::sink::ChatSink;
use crate::error::{ChatError, Result};
use crate::json_ext::JsonExt;
use crate::models::CompletionResult;
use crate::sse::SseFrameBuffer;
use futures_util::{Stream, StreamExt};
use log::warn;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Literal event payload that terminates a stream successfully.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Text deltas extracted from one event payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDelta {
    pub content: Option<String>,
    pub reasoning: Option<String>,
}

impl EventDelta {
    fn is_empty(&self) -> bool {
        self.content.is_none() && self.reasoning.is_none()
    }
}

/// Probe the historically observed payload shapes in fixed priority order
/// and return the first extraction that yields a non-null content or
/// reasoning value.
///
/// Shapes, in order:
/// 1. `{"output": {"text", "reasoning"}}`
/// 2. `{"choices": [{"delta": {"content", "reasoning_content"}}]}`
/// 3. `{"choices": [{"message": {"content", "reasoning_content"}}]}`
/// 4. bare `{"content", "reasoning_content"}`
///
/// No shape matching is an empty delta, not an error. The field name
/// split (`reasoning` vs `reasoning_content`) is a confirmed upstream
/// inconsistency and is tolerated as-is.
pub fn extract_delta(value: &Value) -> EventDelta {
    if let Some(output) = value.get("output") {
        let delta = EventDelta {
            content: output.get_str("text").map(str::to_string),
            reasoning: output.get_str("reasoning").map(str::to_string),
        };
        if !delta.is_empty() {
            return delta;
        }
    }

    if let Some(choice) = value.get_array("choices").and_then(|c| c.first()) {
        if let Some(inner) = choice.get("delta") {
            let delta = EventDelta {
                content: inner.get_str("content").map(str::to_string),
                reasoning: inner.get_str("reasoning_content").map(str::to_string),
            };
            if !delta.is_empty() {
                return delta;
            }
        }
        if let Some(inner) = choice.get("message") {
            let delta = EventDelta {
                content: inner.get_str("content").map(str::to_string),
                reasoning: inner.get_str("reasoning_content").map(str::to_string),
            };
            if !delta.is_empty() {
                return delta;
            }
        }
    }

    EventDelta {
        content: value.get_str("content").map(str::to_string),
        reasoning: value.get_str("reasoning_content").map(str::to_string),
    }
}

/// Terminal and non-terminal decoder states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    /// Still consuming events.
    #[default]
    Active,
    /// The `[DONE]` sentinel (or a clean end of stream) was seen.
    Terminated,
    /// The caller's cancellation signal fired first.
    Cancelled,
    /// The transport failed mid-stream.
    Failed,
}

/// Per-request reassembly state. Never shared across requests.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    answer: String,
    reasoning: String,
    state: StreamState,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Ingest one event payload.
    ///
    /// Returns the extracted delta so the caller can surface it to an
    /// incremental consumer; returns `None` for the sentinel, for events
    /// after termination, and for frames that fail to parse (which are
    /// skipped, never fatal).
    pub fn ingest(&mut self, data: &str) -> Option<EventDelta> {
        if self.state != StreamState::Active {
            return None;
        }
        if data.trim() == DONE_SENTINEL {
            self.state = StreamState::Terminated;
            return None;
        }
        let value: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => {
                warn!("skipping malformed stream event: {}", e);
                return None;
            }
        };
        let delta = extract_delta(&value);
        if let Some(reasoning) = &delta.reasoning
            && !reasoning.is_empty()
        {
            // Cumulative snapshot: replace, never append.
            self.reasoning = reasoning.clone();
        }
        if let Some(content) = &delta.content {
            // Incremental output: append in arrival order.
            self.answer.push_str(content);
        }
        Some(delta)
    }

    /// Mark the stream terminated (clean end of transport without a
    /// sentinel counts as termination).
    pub fn terminate(&mut self) {
        if self.state == StreamState::Active {
            self.state = StreamState::Terminated;
        }
    }

    pub fn cancel(&mut self) {
        if self.state == StreamState::Active {
            self.state = StreamState::Cancelled;
        }
    }

    pub fn fail(&mut self) {
        if self.state == StreamState::Active {
            self.state = StreamState::Failed;
        }
    }

    /// Final result once the stream has terminated.
    pub fn into_result(self) -> CompletionResult {
        let reasoning = if self.reasoning.is_empty() {
            None
        } else {
            Some(self.reasoning)
        };
        CompletionResult {
            content: self.answer,
            reasoning,
        }
    }
}

/// Drive an SSE byte stream to a terminal state.
///
/// Every suspension point honors `cancel`; each answer delta is handed to
/// `sink` in wire order before accumulation continues. Transport errors
/// carry the partial buffers out in the error value.
pub(crate) async fn drive_stream<S, B, E, K>(
    mut bytes: S,
    acc: &mut StreamAccumulator,
    cancel: &CancellationToken,
    sink: &mut K,
) -> Result<()>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    K: ChatSink,
{
    let mut frames = SseFrameBuffer::new();
    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                acc.cancel();
                return Err(ChatError::Cancelled);
            }
            chunk = bytes.next() => chunk,
        };
        match chunk {
            None => break,
            Some(Err(e)) => {
                acc.fail();
                return Err(ChatError::StreamTransport {
                    message: e.to_string(),
                    partial_content: acc.answer().to_string(),
                    partial_reasoning: acc.reasoning().to_string(),
                });
            }
            Some(Ok(chunk)) => {
                frames.push(chunk.as_ref());
                while let Some(data) = frames.next_data() {
                    surface(acc, &data, sink)?;
                    if acc.state() == StreamState::Terminated {
                        return Ok(());
                    }
                }
            }
        }
    }

    // Transport closed without a sentinel: flush any trailing record and
    // treat the end of stream as termination.
    if let Some(data) = frames.finish() {
        surface(acc, &data, sink)?;
    }
    acc.terminate();
    Ok(())
}

/// Ingest one payload and forward its deltas to the incremental consumer.
fn surface<K: ChatSink>(acc: &mut StreamAccumulator, data: &str, sink: &mut K) -> Result<()> {
    if let Some(delta) = acc.ingest(data) {
        if let Some(reasoning) = &delta.reasoning
            && !reasoning.is_empty()
        {
            sink.on_reasoning(reasoning)?;
        }
        if let Some(content) = &delta.content
            && !content.is_empty()
        {
            sink.on_delta(content)?;
        }
    }
    Ok(())
}
