//! File attachment preparation.
//!
//! Uploading is a two-step dance: ask the upstream for short-lived object
//! storage credentials, then hand the bytes to the storage collaborator.
//! The transfer mechanism itself is external — the core only owns the
//! request/response shaping around it, expressed as the [`ObjectStore`]
//! trait. A [`FileRef`] with `status: Uploaded` exists only after a clean
//! transfer; every failure surfaces as [`ChatError::Upload`] instead of a
//! half-valid reference.

use crate::api::QwenClient;
use crate::error::{ChatError, Result};
use crate::json_ext::JsonExt;
use crate::models::{FileClass, FileRef, UploadStatus};
use log::debug;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;

/// Upload category the upstream issues credentials for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    File,
}

impl UploadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadKind::Image => "image",
            UploadKind::File => "file",
        }
    }

    pub fn file_class(&self) -> FileClass {
        match self {
            UploadKind::Image => FileClass::Vision,
            UploadKind::File => FileClass::Document,
        }
    }

    /// Infer the category from the filename's media type.
    pub fn infer(path: &Path) -> Self {
        if guess_mime(path).starts_with("image/") {
            UploadKind::Image
        } else {
            UploadKind::File
        }
    }
}

/// MIME type from the file extension; generic fallback otherwise.
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Short-lived storage credentials issued per upload.
#[derive(Debug, Clone, Deserialize)]
pub struct StsTicket {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub security_token: String,
    pub endpoint: String,
    pub bucketname: String,
    /// Object key to write under.
    pub file_path: String,
    /// Identifier the upstream will know the file by.
    pub file_id: String,
    /// Pre-signed read URL, when the upstream provides one.
    #[serde(default)]
    pub file_url: Option<String>,
}

impl StsTicket {
    /// Readable URL of the object: the pre-signed one when present,
    /// otherwise constructed from bucket and key.
    pub fn object_url(&self) -> String {
        match &self.file_url {
            Some(url) => url.clone(),
            None => format!(
                "https://{}.{}/{}",
                self.bucketname, self.endpoint, self.file_path
            ),
        }
    }
}

/// External object-storage transfer collaborator.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    /// Write `bytes` under the ticket's object key using its credentials.
    async fn put_object(&self, ticket: &StsTicket, bytes: &[u8]) -> Result<()>;
}

impl QwenClient {
    /// Request short-lived upload credentials for one file.
    ///
    /// An unsuccessful upstream result stops the attachment attempt here;
    /// the transfer step never runs without a ticket.
    pub async fn get_sts_token(
        &self,
        filename: &str,
        filesize: u64,
        kind: UploadKind,
    ) -> Result<StsTicket> {
        let body = json!({
            "filename": filename,
            "filesize": filesize,
            "filetype": kind.as_str(),
        });
        let value = self.post_json("/v2/files/getstsToken", &body).await?;
        if !value.get_bool_or("success", false) {
            return Err(ChatError::Upload {
                message: format!("credential issuance refused: {}", value),
                code: value.get_str("code").map(str::to_string),
            });
        }
        let data = value.get("data").cloned().unwrap_or(value);
        serde_json::from_value(data).map_err(|e| ChatError::Upload {
            message: format!("malformed credential payload: {}", e),
            code: None,
        })
    }

    /// Complete upload flow: stat the file, obtain credentials, transfer
    /// the bytes through `store`, and return the reference to embed in a
    /// message. The returned ref always has `status: Uploaded`.
    pub async fn prepare_attachment<O: ObjectStore>(
        &self,
        path: &Path,
        declared: Option<UploadKind>,
        store: &O,
    ) -> Result<FileRef> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ChatError::Validation(format!("attachment path has no file name: {:?}", path))
            })?
            .to_string();
        let size = tokio::fs::metadata(path).await?.len();
        let kind = declared.unwrap_or_else(|| UploadKind::infer(path));

        let ticket = self.get_sts_token(&name, size, kind).await?;
        debug!("uploading {} ({} bytes) as {}", name, size, ticket.file_id);

        let bytes = tokio::fs::read(path).await?;
        if let Err(e) = store.put_object(&ticket, &bytes).await {
            return Err(match e {
                upload @ ChatError::Upload { .. } => upload,
                other => ChatError::Upload {
                    message: format!("object transfer failed: {}", other),
                    code: None,
                },
            });
        }

        Ok(FileRef {
            kind: kind.as_str().to_string(),
            id: ticket.file_id.clone(),
            url: ticket.object_url(),
            name,
            size,
            file_type: guess_mime(path).to_string(),
            file_class: kind.file_class(),
            status: UploadStatus::Uploaded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_inference() {
        assert_eq!(UploadKind::infer(Path::new("photo.JPG")), UploadKind::Image);
        assert_eq!(UploadKind::infer(Path::new("notes.pdf")), UploadKind::File);
        assert_eq!(UploadKind::infer(Path::new("no_extension")), UploadKind::File);
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime(Path::new("a.png")), "image/png");
        assert_eq!(guess_mime(Path::new("a.PDF")), "application/pdf");
        assert_eq!(guess_mime(Path::new("a.bin")), "application/octet-stream");
    }

    #[test]
    fn test_file_class_mapping() {
        assert_eq!(UploadKind::Image.file_class(), FileClass::Vision);
        assert_eq!(UploadKind::File.file_class(), FileClass::Document);
    }

    #[test]
    fn test_ticket_deserializes() {
        let ticket: StsTicket = serde_json::from_value(json!({
            "access_key_id": "ak",
            "access_key_secret": "sk",
            "security_token": "st",
            "endpoint": "oss.example.com",
            "bucketname": "bucket",
            "file_path": "uploads/a.png",
            "file_id": "f1"
        }))
        .unwrap();
        assert_eq!(ticket.file_id, "f1");
        assert!(ticket.file_url.is_none());
    }

    #[test]
    fn test_object_url_prefers_presigned() {
        let mut ticket: StsTicket = serde_json::from_value(json!({
            "access_key_id": "ak",
            "access_key_secret": "sk",
            "security_token": "st",
            "endpoint": "oss.example.com",
            "bucketname": "bucket",
            "file_path": "uploads/a.png",
            "file_id": "f1"
        }))
        .unwrap();
        assert_eq!(
            ticket.object_url(),
            "https://bucket.oss.example.com/uploads/a.png"
        );
        ticket.file_url = Some("https://signed.example/a.png".to_string());
        assert_eq!(ticket.object_url(), "https://signed.example/a.png");
    }
}
