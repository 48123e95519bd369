//! Local document helpers
//!
//! Staging-side utilities used around a conversion: MIME lookup by file
//! extension, the upload allow-list, collision-free staged names and
//! best-effort cleanup of staged files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{CoreError, Result};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_TXT: &str = "text/plain";
pub const MIME_RTF: &str = "application/rtf";
pub const MIME_ODT: &str = "application/vnd.oasis.opendocument.text";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

/// Types accepted for upload.
pub const ALLOWED_UPLOAD_TYPES: &[&str] = &[MIME_PDF, MIME_DOCX, MIME_DOC, MIME_TXT];

/// A document staged on local disk, waiting to be converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDocument {
    /// Where the staged bytes live
    pub path: PathBuf,
    /// Name the user uploaded it under; also the remote display name
    pub file_name: String,
}

impl LocalDocument {
    pub fn new(path: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_name: file_name.into(),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        mime_type_for(&self.file_name)
    }
}

/// MIME type for a file name, by its (case-insensitive) extension.
pub fn mime_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());

    match extension.as_deref() {
        Some("pdf") => MIME_PDF,
        Some("docx") => MIME_DOCX,
        Some("doc") => MIME_DOC,
        Some("txt") => MIME_TXT,
        Some("rtf") => MIME_RTF,
        Some("odt") => MIME_ODT,
        _ => MIME_OCTET_STREAM,
    }
}

pub fn is_allowed_upload_type(mime_type: &str) -> bool {
    ALLOWED_UPLOAD_TYPES.contains(&mime_type)
}

/// `<stem>-<unix millis>-<8 hex chars><.ext>`, with the millis taken from `now`.
pub fn unique_file_name(original: &str, now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    compose_unique_name(original, now.timestamp_millis(), &suffix[..8])
}

fn compose_unique_name(original: &str, millis: i64, suffix: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    format!("{}-{}-{}{}", stem, millis, suffix, extension)
}

/// Create the staging directory (and parents) if missing.
pub async fn ensure_upload_dir(path: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| CoreError::UploadDir {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(path.to_path_buf())
}

/// Remove a staged file. A file that is already gone counts as removed.
pub async fn remove_local_file(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => {
            warn!(path = %path.display(), "Error deleting file: {}", e);
            false
        }
    }
}
