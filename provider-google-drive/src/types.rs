//! Google Drive API types
//!
//! Request and response bodies for the Drive API v3 calls the connector
//! makes, plus the provider-neutral [`RemoteFile`] handed back to callers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// MIME type of a native Google Docs document.
pub const GOOGLE_DOCS_MIME_TYPE: &str = "application/vnd.google-apps.document";

/// Appended to the source name when creating the editable copy.
pub const EDITABLE_NAME_SUFFIX: &str = " (Editable)";

/// Google Drive API file resource
///
/// Only the fields this crate requests are modelled; every one of them may
/// be absent depending on the `fields` selector of the call.
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Link for opening the file in the browser
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,

    /// Link for downloading the content (binary files only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_content_link: Option<String>,
}

/// Metadata part of a multipart upload and body of `files.copy`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileWriteRequest<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<&'a str>,
}

/// Google Drive API permission resource
///
/// See: https://developers.google.com/drive/api/v3/reference/permissions#resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub role: String,

    #[serde(rename = "type")]
    pub grantee_type: String,
}

impl Permission {
    /// Edit access for anyone holding the link.
    pub fn anyone_writer() -> Self {
        Self {
            id: None,
            role: "writer".to_string(),
            grantee_type: "anyone".to_string(),
        }
    }
}

/// Error body returned by the Drive API on a non-2xx status.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}

/// Handle to a file held by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub mime_type: Option<String>,
    pub view_url: Option<String>,
    pub download_url: Option<String>,
    /// Set only for documents produced by a conversion
    pub edit_url: Option<String>,
}

impl From<DriveFile> for RemoteFile {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            view_url: file.web_view_link,
            download_url: file.web_content_link,
            edit_url: None,
        }
    }
}

/// The provider operations, used to label errors and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveOperation {
    Upload,
    Convert,
    Delete,
}

impl DriveOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriveOperation::Upload => "upload file",
            DriveOperation::Convert => "convert document",
            DriveOperation::Delete => "delete file",
        }
    }
}

impl fmt::Display for DriveOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
