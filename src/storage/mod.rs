//! Uploaded file storage: offer images, post images, profile pictures and resumes.

pub mod local;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

use crate::error::{Error, Result};

pub use local::LocalFileStore;
pub use memory::MemoryFileStore;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
pub const RESUME_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "odt", "rtf", "txt"];

/// A file received in a multipart body.
#[derive(Debug, Clone)]
pub struct Upload {
    pub field: String,
    pub file_name: String,
    pub bytes: Bytes,
}

impl Upload {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stores the upload under `namespace` with a generated name and returns
    /// the relative path. Never overwrites an existing file.
    async fn store(
        &self,
        namespace: &str,
        prefix: &str,
        upload: &Upload,
        allowed: &[&'static str],
    ) -> Result<String>;

    async fn delete(&self, path: &str) -> Result<()>;
}

/// Lower-cased extension of `file_name` if it is in `allowed` and the content
/// looks like what the extension claims.
pub fn validated_extension(upload: &Upload, allowed: &[&str]) -> Result<String> {
    let ext = Path::new(&upload.file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_else(|| "bin".to_string());

    if !allowed.contains(&ext.as_str()) {
        return Err(Error::BadRequest(format!("File type .{} is not allowed", ext)));
    }
    if upload.is_empty() {
        return Err(Error::BadRequest("Uploaded file is empty".into()));
    }

    let data = &upload.bytes;
    if ext == "pdf" && !data.starts_with(b"%PDF") {
        return Err(Error::BadRequest("Invalid PDF file content".into()));
    }
    if (ext == "jpg" || ext == "jpeg") && !data.starts_with(&[0xFF, 0xD8]) {
        return Err(Error::BadRequest("Invalid JPEG file content".into()));
    }
    if ext == "png" && !data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return Err(Error::BadRequest("Invalid PNG file content".into()));
    }

    Ok(ext)
}

pub(crate) fn generated_name(prefix: &str, ext: &str) -> String {
    format!("{}_{}.{}", prefix, uuid::Uuid::new_v4().simple(), ext)
}

/// Rejects stored references that would escape the upload root.
pub(crate) fn checked_relative(path: &str) -> Result<&str> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.split('/').any(|part| part == ".." || part.is_empty()) {
        return Err(Error::BadRequest(format!("Invalid file reference '{}'", path)));
    }
    Ok(trimmed)
}
