//! Google Drive API connector
//!
//! One connector carries one access token. It makes exactly one HTTP call
//! per method and never retries; deciding what to do with a rejected token
//! is the job of [`DriveService`](crate::DriveService).

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::{GoogleDriveError, Result};
use crate::types::{ApiErrorEnvelope, DriveFile, FileWriteRequest, Permission};

/// Google Drive API base URL
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Google Drive media upload base URL
pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Fields to request for an uploaded file
const UPLOAD_FIELDS: &str = "id,name,mimeType,webViewLink,webContentLink";

/// Fields to request for a copied file
const COPY_FIELDS: &str = "id,name,mimeType,webViewLink";

/// Fields to request when reading source metadata
const METADATA_FIELDS: &str = "name,mimeType";

/// Google Drive API connector
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::DriveConnector;
///
/// let drive = DriveConnector::new(http_client, session.access_token.clone());
/// let file = drive.upload("report.pdf", "application/pdf", bytes).await?;
/// ```
pub struct DriveConnector {
    http_client: Arc<dyn HttpClient>,
    access_token: String,
}

impl DriveConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: impl Into<String>) -> Self {
        Self {
            http_client,
            access_token: access_token.into(),
        }
    }

    /// Create a file from `content` with a multipart upload.
    #[instrument(skip(self, content), fields(name = %name, bytes = content.len()))]
    pub async fn upload(&self, name: &str, mime_type: &str, content: Bytes) -> Result<DriveFile> {
        let metadata = serde_json::to_vec(&FileWriteRequest {
            name,
            mime_type: None,
        })
        .map_err(|e| GoogleDriveError::ParseError(format!("Failed to encode metadata: {}", e)))?;

        let boundary = format!("drive-convert-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related(&boundary, &metadata, mime_type, &content);

        let url = format!(
            "{}/files?uploadType=multipart&fields={}",
            DRIVE_UPLOAD_BASE, UPLOAD_FIELDS
        );
        let request = self
            .request(HttpMethod::Post, url)
            .header(
                "Content-Type",
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body);

        let response = self.send(request).await?;
        let file: DriveFile = parse(&response, "uploaded file")?;

        debug!(file_id = %file.id, "Upload accepted");
        Ok(file)
    }

    #[instrument(skip(self), fields(file_id = %file_id))]
    pub async fn get_metadata(&self, file_id: &str) -> Result<DriveFile> {
        let url = format!(
            "{}/files/{}?fields={}",
            DRIVE_API_BASE,
            urlencoding::encode(file_id),
            METADATA_FIELDS
        );

        let response = self.send(self.request(HttpMethod::Get, url)).await?;
        parse(&response, "file metadata")
    }

    /// Copy `file_id` under a new name, converting it to `mime_type`.
    #[instrument(skip(self), fields(file_id = %file_id))]
    pub async fn copy_as(&self, file_id: &str, name: &str, mime_type: &str) -> Result<DriveFile> {
        let url = format!(
            "{}/files/{}/copy?fields={}",
            DRIVE_API_BASE,
            urlencoding::encode(file_id),
            COPY_FIELDS
        );
        let request = self.request(HttpMethod::Post, url).json(&FileWriteRequest {
            name,
            mime_type: Some(mime_type),
        })?;

        let response = self.send(request).await?;
        parse(&response, "copied file")
    }

    #[instrument(skip(self, permission), fields(file_id = %file_id, role = %permission.role))]
    pub async fn create_permission(
        &self,
        file_id: &str,
        permission: &Permission,
    ) -> Result<Permission> {
        let url = format!(
            "{}/files/{}/permissions?fields=id",
            DRIVE_API_BASE,
            urlencoding::encode(file_id)
        );
        let request = self.request(HttpMethod::Post, url).json(permission)?;

        let response = self.send(request).await?;
        let created: PermissionId = parse(&response, "permission")?;

        Ok(Permission {
            id: created.id,
            ..permission.clone()
        })
    }

    #[instrument(skip(self), fields(file_id = %file_id))]
    pub async fn delete(&self, file_id: &str) -> Result<()> {
        let url = format!("{}/files/{}", DRIVE_API_BASE, urlencoding::encode(file_id));
        self.send(self.request(HttpMethod::Delete, url)).await?;
        Ok(())
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        HttpRequest::new(method, url)
            .bearer_token(&self.access_token)
            .header("Accept", "application/json")
    }

    /// Execute once and turn a non-2xx status into [`GoogleDriveError::ApiError`].
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        let response = self.http_client.execute(request).await?;

        if response.is_success() {
            debug!(%method, status = response.status, "API request succeeded");
            return Ok(response);
        }

        let status = response.status;
        let message = api_error_message(&response);
        warn!(%method, status, "API request failed: {}", message);

        Err(GoogleDriveError::ApiError {
            status_code: status,
            message,
        })
    }
}

#[derive(serde::Deserialize)]
struct PermissionId {
    #[serde(default)]
    id: Option<String>,
}

fn parse<T: DeserializeOwned>(response: &HttpResponse, what: &str) -> Result<T> {
    serde_json::from_slice(&response.body)
        .map_err(|e| GoogleDriveError::ParseError(format!("Failed to parse {}: {}", what, e)))
}

/// Prefer the API's own `error.message`, else the raw body.
fn api_error_message(response: &HttpResponse) -> String {
    if let Ok(envelope) = serde_json::from_slice::<ApiErrorEnvelope>(&response.body) {
        if !envelope.error.message.is_empty() {
            return envelope.error.message;
        }
    }
    let body = String::from_utf8_lossy(&response.body).trim().to_string();
    if body.is_empty() {
        format!("HTTP {}", response.status)
    } else {
        body
    }
}

/// Body of a `multipart/related` upload: JSON metadata, then the media.
fn multipart_related(boundary: &str, metadata: &[u8], mime_type: &str, content: &[u8]) -> Bytes {
    let mut body = BytesMut::with_capacity(content.len() + metadata.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body.freeze()
}
