//! qwen-chat-core: unofficial client for the Qwen web chat API.
//!
//! Provides an authenticated session, conversation management, message
//! sending with attachments, and streaming response reassembly — the
//! upstream interleaves visible answer text with a reasoning/thinking
//! channel in one SSE stream, and this crate folds both back into a
//! single [`CompletionResult`].
//!
//! # Quick Start
//!
//! ```no_run
//! use qwen_chat_core::{ClientConfig, CollectingSink, QwenClient, SendOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), qwen_chat_core::ChatError> {
//!     let token = std::env::var("QWEN_TOKEN").expect("QWEN_TOKEN not set");
//!     let client = QwenClient::new(token, ClientConfig::from_env())?;
//!
//!     let chat = client.create_chat("hello", None).await?;
//!     let mut sink = CollectingSink::new();
//!     let result = client
//!         .send_message_streaming(
//!             &chat.id,
//!             "Hello!",
//!             &SendOptions::new(),
//!             &CancellationToken::new(),
//!             &mut sink,
//!         )
//!         .await?;
//!     println!("{}", result.content);
//!     Ok(())
//! }
//! ```
//!
//! The HTTP front door, token persistence, and the object-storage
//! transfer mechanism are collaborators of this crate, not part of it;
//! see [`upload::ObjectStore`] for the storage seam.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod json_ext;
pub mod models;
pub mod registry;
pub mod sse;
pub mod stream;
pub mod upload;

// Re-export commonly used types
pub use api::{ChatSink, CollectingSink, FnSink, NullSink, QwenClient, SendOptions};
pub use auth::Session;
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::{ChatError, Result};
pub use models::{
    ChatSummary, CompletionResult, ConversationRef, FileClass, FileRef, MessageNode, Role,
    UploadStatus,
};
pub use registry::ClientRegistry;
pub use sse::SseFrameBuffer;
pub use stream::{DONE_SENTINEL, EventDelta, StreamAccumulator, StreamState, extract_delta};
pub use upload::{ObjectStore, StsTicket, UploadKind};
