//! Incremental consumer abstraction.
//!
//! The decoder emits answer deltas as they arrive on the wire; a
//! [`ChatSink`] receives them without the decoder knowing anything about
//! presentation. Buffered callers that only want the final
//! `CompletionResult` can pass [`NullSink`].

use std::io;

/// Receiver for incremental stream output.
///
/// `on_delta` is called once per answer fragment, in exact wire order,
/// before the fragment is folded into the cumulative result. An `Err`
/// from the sink aborts the request.
pub trait ChatSink {
    /// Handle one incremental answer fragment.
    fn on_delta(&mut self, text: &str) -> io::Result<()>;

    /// Handle a reasoning snapshot. Snapshots are cumulative: each call
    /// replaces the previous value. Default is to ignore them.
    fn on_reasoning(&mut self, text: &str) -> io::Result<()> {
        let _ = text;
        Ok(())
    }
}

/// Sink that discards everything. For buffered calls.
#[derive(Debug, Default)]
pub struct NullSink;

impl ChatSink for NullSink {
    fn on_delta(&mut self, _text: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that collects output for programmatic use or tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    /// Concatenation of every answer fragment.
    pub text: String,
    /// Each fragment as it arrived, in order.
    pub deltas: Vec<String>,
    /// Latest reasoning snapshot.
    pub reasoning: String,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChatSink for CollectingSink {
    fn on_delta(&mut self, text: &str) -> io::Result<()> {
        self.text.push_str(text);
        self.deltas.push(text.to_string());
        Ok(())
    }

    fn on_reasoning(&mut self, text: &str) -> io::Result<()> {
        self.reasoning = text.to_string();
        Ok(())
    }
}

/// Sink that forwards fragments through a closure, for callers that want
/// streaming output without defining a type.
pub struct FnSink<F: FnMut(&str)> {
    f: F,
}

impl<F: FnMut(&str)> FnSink<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F: FnMut(&str)> ChatSink for FnSink<F> {
    fn on_delta(&mut self, text: &str) -> io::Result<()> {
        (self.f)(text);
        Ok(())
    }
}
