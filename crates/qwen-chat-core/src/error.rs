//! Error taxonomy for the client.
//!
//! Every fallible operation in the crate returns [`ChatError`]. Per-frame
//! parse failures inside an SSE stream are the one exception to strict
//! propagation: they are logged and skipped, never raised.

use thiserror::Error;

/// Errors surfaced by the client API.
#[derive(Debug, Error)]
pub enum ChatError {
    /// No credential, or a credential that cannot be placed in a header.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Malformed caller input (empty content, unuploaded attachment, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// Non-2xx response from a buffered upstream call.
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Transport failure mid-stream. Carries whatever was accumulated so
    /// far; callers may treat the partial output as best-effort salvage.
    #[error("stream transport error: {message}")]
    StreamTransport {
        message: String,
        partial_content: String,
        partial_reasoning: String,
    },

    /// Upload credential issuance or object transfer failure.
    #[error("upload error: {message}")]
    Upload {
        message: String,
        /// Upstream diagnostic code, when the upstream provided one.
        code: Option<String>,
    },

    /// The caller's cancellation signal fired before the stream terminated.
    #[error("request cancelled")]
    Cancelled,

    /// Errors raised by the underlying HTTP client.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local I/O failures (reading attachment bytes, sink writes).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ChatError>;
