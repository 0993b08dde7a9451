//! Outgoing payload construction (the message thread builder).
//!
//! Turns a caller-facing send into the upstream's threading format: one
//! new message node plus conversation-level fields. Parent linkage is
//! resolved by the caller (see `QwenClient::resolve_parent`) before the
//! payload is built.

use crate::error::Result;
use crate::json_ext::JsonExt;
use crate::models::{FileRef, MessageNode, now_timestamp};
use serde_json::{Value, json};

/// Options for one send.
#[derive(Debug, Clone)]
pub struct SendOptions {
    /// Model identifier; falls back to the configured default.
    pub model: Option<String>,
    /// Explicit parent message id. When `None`, the most recent message
    /// in the conversation history is used; a failed lookup means "no
    /// parent", silently.
    pub parent_id: Option<String>,
    /// Instruction text prepended to the message content through a fixed
    /// textual template. This is a documented convention, not a protocol
    /// system-role field — the upstream's support for a real system role
    /// is unreliable.
    pub system_prompt: Option<String>,
    /// Attachments; every ref must have finished uploading.
    pub files: Vec<FileRef>,
    /// Request the reasoning/thinking channel.
    pub thinking_enabled: bool,
    /// Request web-search augmentation.
    pub search_enabled: bool,
    /// Ask the upstream for an event stream rather than one buffered body.
    pub stream: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            model: None,
            parent_id: None,
            system_prompt: None,
            files: Vec::new(),
            thinking_enabled: false,
            search_enabled: false,
            stream: true,
        }
    }
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_files(mut self, files: Vec<FileRef>) -> Self {
        self.files = files;
        self
    }

    pub fn thinking(mut self, enabled: bool) -> Self {
        self.thinking_enabled = enabled;
        self
    }

    pub fn search(mut self, enabled: bool) -> Self {
        self.search_enabled = enabled;
        self
    }

    /// Use the buffered (non-streaming) code path.
    pub fn buffered(mut self) -> Self {
        self.stream = false;
        self
    }
}

/// Prepend an instruction to message content using the fixed template.
pub fn apply_system_prompt(content: &str, system_prompt: &str) -> String {
    format!(
        "[INSTRUCTION]\n{}\n\n[MESSAGE]\n{}\n",
        system_prompt, content
    )
}

/// Build the complete send payload: exactly one new message node plus the
/// conversation-level fields. Validates content and attachments before
/// anything touches the network.
pub fn build_send_body(
    chat_id: &str,
    content: &str,
    parent_id: Option<String>,
    model: &str,
    options: &SendOptions,
) -> Result<Value> {
    let content = match &options.system_prompt {
        Some(prompt) => apply_system_prompt(content, prompt),
        None => content.to_string(),
    };

    let mut node = MessageNode::user(content);
    node.parent_id = parent_id.clone();
    node.files = options.files.clone();
    node.thinking_enabled = options.thinking_enabled;
    node.search_enabled = options.search_enabled;
    node.validate()?;

    let timestamp = now_timestamp();
    Ok(json!({
        "stream": options.stream,
        "incremental_output": true,
        "chat_id": chat_id,
        "chat_mode": "normal",
        "model": model,
        "parent_id": parent_id,
        "messages": [node.to_wire(model)],
        "timestamp": timestamp,
        "size": "1:1"
    }))
}

/// Pull the most recent message id out of a conversation history payload.
/// Any shape mismatch yields `None` — parent auto-detection never fails a
/// send.
pub fn parent_from_history(history: &Value) -> Option<String> {
    if !history.get_bool_or("success", false) {
        return None;
    }
    history
        .get("data")?
        .get_str("currentId")
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use crate::models::{FileClass, UploadStatus};
    use serde_json::json;

    fn file_ref(status: UploadStatus) -> FileRef {
        FileRef {
            kind: "file".to_string(),
            id: "f1".to_string(),
            url: "https://oss.example/doc.pdf".to_string(),
            name: "doc.pdf".to_string(),
            size: 64,
            file_type: "application/pdf".to_string(),
            file_class: FileClass::Document,
            status,
        }
    }

    #[test]
    fn test_body_has_one_message_node() {
        let body =
            build_send_body("c1", "Hello", None, "qwen3-max", &SendOptions::new()).unwrap();
        assert_eq!(body["chat_id"], "c1");
        assert_eq!(body["stream"], true);
        assert_eq!(body["incremental_output"], true);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["content"], "Hello");
        assert!(body["parent_id"].is_null());
    }

    #[test]
    fn test_parent_threads_through_both_spellings() {
        let body = build_send_body(
            "c1",
            "Hello",
            Some("m1".to_string()),
            "qwen3-max",
            &SendOptions::new(),
        )
        .unwrap();
        assert_eq!(body["parent_id"], "m1");
        assert_eq!(body["messages"][0]["parentId"], "m1");
        assert_eq!(body["messages"][0]["parent_id"], "m1");
    }

    #[test]
    fn test_search_tag_consistent_in_all_positions() {
        let body = build_send_body(
            "c1",
            "latest news",
            None,
            "qwen3-max",
            &SendOptions::new().search(true),
        )
        .unwrap();
        let node = &body["messages"][0];
        assert_eq!(node["chat_type"], "search");
        assert_eq!(node["sub_chat_type"], "search");
        assert_eq!(node["extra"]["meta"]["subChatType"], "search");
    }

    #[test]
    fn test_system_prompt_template() {
        let merged = apply_system_prompt("What is 2+2?", "Answer tersely.");
        assert_eq!(
            merged,
            "[INSTRUCTION]\nAnswer tersely.\n\n[MESSAGE]\nWhat is 2+2?\n"
        );
    }

    #[test]
    fn test_system_prompt_applied_to_node_content() {
        let body = build_send_body(
            "c1",
            "hi",
            None,
            "qwen3-max",
            &SendOptions::new().with_system_prompt("Be brief."),
        )
        .unwrap();
        let content = body["messages"][0]["content"].as_str().unwrap();
        assert!(content.starts_with("[INSTRUCTION]\nBe brief."));
        assert!(content.contains("[MESSAGE]\nhi"));
    }

    #[test]
    fn test_empty_content_rejected() {
        let err =
            build_send_body("c1", "", None, "qwen3-max", &SendOptions::new()).unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[test]
    fn test_failed_attachment_rejected() {
        let options = SendOptions::new().with_files(vec![file_ref(UploadStatus::Failed)]);
        let err = build_send_body("c1", "see file", None, "qwen3-max", &options).unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[test]
    fn test_uploaded_attachment_embedded() {
        let options = SendOptions::new().with_files(vec![file_ref(UploadStatus::Uploaded)]);
        let body = build_send_body("c1", "see file", None, "qwen3-max", &options).unwrap();
        assert_eq!(body["messages"][0]["files"][0]["id"], "f1");
        assert_eq!(body["messages"][0]["files"][0]["status"], "uploaded");
    }

    #[test]
    fn test_thinking_flag_in_feature_config() {
        let body = build_send_body(
            "c1",
            "hard question",
            None,
            "qwen3-max",
            &SendOptions::new().thinking(true),
        )
        .unwrap();
        assert_eq!(
            body["messages"][0]["feature_config"]["thinking_enabled"],
            true
        );
    }

    #[test]
    fn test_parent_from_history() {
        let history = json!({"success": true, "data": {"currentId": "m1"}});
        assert_eq!(parent_from_history(&history).as_deref(), Some("m1"));
    }

    #[test]
    fn test_parent_from_history_tolerates_bad_shapes() {
        assert_eq!(parent_from_history(&json!({"success": false})), None);
        assert_eq!(parent_from_history(&json!({"data": {}})), None);
        assert_eq!(
            parent_from_history(&json!({"success": true, "data": {"currentId": null}})),
            None
        );
        assert_eq!(parent_from_history(&json!("nonsense")), None);
    }
}
