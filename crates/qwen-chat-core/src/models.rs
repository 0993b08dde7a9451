//! Data types shared across the client.
//!
//! [`MessageNode`] carries its own wire serialization because the upstream
//! payload duplicates the parent linkage under two spellings (`parentId`
//! and `parent_id`) and nests the chat-type tag in two places; a plain
//! serde derive cannot express that, so the node renders itself with
//! `json!` instead.

use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

/// Seconds since the Unix epoch.
pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// How the upstream treats an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileClass {
    Vision,
    Document,
}

/// Outcome of an attachment upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploaded,
    Failed,
}

/// Reference to an uploaded file, embedded into outgoing messages.
///
/// Immutable once constructed; only refs with [`UploadStatus::Uploaded`]
/// may be attached to a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRef {
    /// Upload category the credential was issued for (`image` or `file`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Identifier assigned by the upload credential step.
    pub id: String,
    pub url: String,
    pub name: String,
    pub size: u64,
    /// MIME type.
    pub file_type: String,
    pub file_class: FileClass,
    pub status: UploadStatus,
}

/// One new message in the upstream's thread format.
///
/// Each node links to the prior message it replies to via `parent_id`,
/// forming a linear chain per conversation. The `fid` is caller-generated.
#[derive(Debug, Clone)]
pub struct MessageNode {
    pub fid: String,
    pub parent_id: Option<String>,
    pub role: Role,
    pub content: String,
    pub files: Vec<FileRef>,
    pub timestamp: i64,
    pub thinking_enabled: bool,
    pub search_enabled: bool,
}

impl MessageNode {
    /// A fresh user message with a random `fid` and the current time.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            fid: Uuid::new_v4().to_string(),
            parent_id: None,
            role: Role::User,
            content: content.into(),
            files: Vec::new(),
            timestamp: now_timestamp(),
            thinking_enabled: false,
            search_enabled: false,
        }
    }

    /// Conversation category tag; must agree everywhere it appears in the
    /// payload or the upstream may reject the request.
    pub fn chat_type_tag(&self) -> &'static str {
        if self.search_enabled { "search" } else { "t2t" }
    }

    /// Validate that every attached ref finished uploading.
    pub fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(ChatError::Validation("message content is empty".to_string()));
        }
        for file in &self.files {
            if file.status != UploadStatus::Uploaded {
                return Err(ChatError::Validation(format!(
                    "attachment '{}' has not been uploaded",
                    file.name
                )));
            }
        }
        Ok(())
    }

    /// Render the node in the upstream's message format.
    pub fn to_wire(&self, model: &str) -> Value {
        let tag = self.chat_type_tag();
        json!({
            "fid": self.fid,
            "parentId": self.parent_id,
            "childrenIds": [],
            "role": self.role.as_str(),
            "content": self.content,
            "user_action": "chat",
            "files": self.files,
            "timestamp": self.timestamp,
            "models": [model],
            "chat_type": tag,
            "feature_config": {
                "thinking_enabled": self.thinking_enabled,
                "output_schema": "phase"
            },
            "extra": {
                "meta": {
                    "subChatType": tag
                }
            },
            "sub_chat_type": tag,
            "parent_id": self.parent_id
        })
    }
}

/// Handle on a conversation thread: its id plus the most recent message
/// id, which becomes the parent of the next turn.
#[derive(Debug, Clone, Default)]
pub struct ConversationRef {
    pub chat_id: String,
    pub last_message_id: Option<String>,
}

impl ConversationRef {
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            last_message_id: None,
        }
    }

    /// Record a successful send: `id` is the parent for the next turn.
    pub fn advance(&mut self, id: impl Into<String>) {
        self.last_message_id = Some(id.into());
    }
}

/// Summary row from the conversation listing endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatSummary {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Final reassembled result of one chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    /// Visible answer text.
    pub content: String,
    /// Reasoning/thinking channel, present only if the upstream emitted any.
    pub reasoning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploaded_ref() -> FileRef {
        FileRef {
            kind: "image".to_string(),
            id: "f1".to_string(),
            url: "https://oss.example/f1.png".to_string(),
            name: "f1.png".to_string(),
            size: 12,
            file_type: "image/png".to_string(),
            file_class: FileClass::Vision,
            status: UploadStatus::Uploaded,
        }
    }

    #[test]
    fn test_chat_type_tag() {
        let mut node = MessageNode::user("hi");
        assert_eq!(node.chat_type_tag(), "t2t");
        node.search_enabled = true;
        assert_eq!(node.chat_type_tag(), "search");
    }

    #[test]
    fn test_validate_rejects_empty_content() {
        let node = MessageNode::user("   ");
        assert!(matches!(node.validate(), Err(ChatError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_failed_upload() {
        let mut node = MessageNode::user("see attachment");
        let mut file = uploaded_ref();
        file.status = UploadStatus::Failed;
        node.files.push(file);
        assert!(matches!(node.validate(), Err(ChatError::Validation(_))));
    }

    #[test]
    fn test_wire_format_duplicates_parent_and_tag() {
        let mut node = MessageNode::user("hello");
        node.parent_id = Some("m1".to_string());
        node.search_enabled = true;
        let wire = node.to_wire("qwen3-max");

        assert_eq!(wire["parentId"], "m1");
        assert_eq!(wire["parent_id"], "m1");
        assert_eq!(wire["chat_type"], "search");
        assert_eq!(wire["sub_chat_type"], "search");
        assert_eq!(wire["extra"]["meta"]["subChatType"], "search");
        assert_eq!(wire["models"][0], "qwen3-max");
        assert_eq!(wire["feature_config"]["thinking_enabled"], false);
    }

    #[test]
    fn test_wire_format_null_parent() {
        let node = MessageNode::user("hello");
        let wire = node.to_wire("qwen3-max");
        assert!(wire["parentId"].is_null());
        assert!(wire["parent_id"].is_null());
    }

    #[test]
    fn test_conversation_advance() {
        let mut conv = ConversationRef::new("c1");
        assert!(conv.last_message_id.is_none());
        conv.advance("m9");
        assert_eq!(conv.last_message_id.as_deref(), Some("m9"));
    }

    #[test]
    fn test_file_ref_serializes_kind_as_type() {
        let wire = serde_json::to_value(uploaded_ref()).unwrap();
        assert_eq!(wire["type"], "image");
        assert_eq!(wire["status"], "uploaded");
        assert_eq!(wire["file_class"], "vision");
    }
}
