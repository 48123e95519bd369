//! Drive operations on behalf of a signed-in user
//!
//! Every operation runs through [`DriveService::execute_with_auth_retry`]:
//!
//! 1. refresh the user's token if it is about to expire,
//! 2. build a connector from the current session,
//! 3. make the call,
//! 4. on a 401 force one refresh and retry once with a fresh connector.
//!
//! Nothing else is retried. A second 401 becomes
//! [`GoogleDriveError::AuthenticationFailed`]; any other failure becomes
//! [`GoogleDriveError::ProviderOperation`].

use bridge_traits::http::HttpClient;
use bytes::Bytes;
use core_auth::{CredentialSession, Credentials, SessionRegistry, UserId};
use core_runtime::logging::DiagnosticLogger;
use serde_json::json;
use std::future::Future;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

use crate::connector::DriveConnector;
use crate::error::{GoogleDriveError, Result};
use crate::types::{
    DriveOperation, Permission, RemoteFile, EDITABLE_NAME_SUFFIX, GOOGLE_DOCS_MIME_TYPE,
};

/// Component tag on every diagnostic line from this service.
pub const COMPONENT: &str = "GoogleDriveService";

/// Replace a trailing `/view` with `/edit`.
///
/// Anything else, including `/view` in the middle of the URL or a query
/// string after it, is returned unchanged.
pub fn derive_edit_url(view_url: &str) -> String {
    match view_url.strip_suffix("/view") {
        Some(base) => format!("{}/edit", base),
        None => view_url.to_string(),
    }
}

pub struct DriveService {
    registry: Arc<SessionRegistry>,
    http_client: Arc<dyn HttpClient>,
    logger: DiagnosticLogger,
}

impl DriveService {
    pub fn new(
        registry: Arc<SessionRegistry>,
        http_client: Arc<dyn HttpClient>,
        debug_mode: bool,
    ) -> Self {
        Self {
            registry,
            http_client,
            logger: DiagnosticLogger::new(COMPONENT, debug_mode),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Create or replace the user's session.
    ///
    /// # Errors
    ///
    /// [`GoogleDriveError::Auth`] wrapping `InvalidCredentials` if the access
    /// token is empty.
    pub async fn init_session(
        &self,
        user_id: &UserId,
        credentials: Credentials,
    ) -> Result<CredentialSession> {
        Ok(self.registry.init_session(user_id, credentials).await?)
    }

    /// Upload the file at `path` as `file_name`.
    ///
    /// The source is read before anything else happens, so a missing file
    /// fails with [`GoogleDriveError::SourceNotFound`] without touching the
    /// network (not even a token refresh).
    #[instrument(skip(self, path), fields(user_id = %user_id, file_name = %file_name))]
    pub async fn upload_file(
        &self,
        user_id: &UserId,
        path: impl AsRef<Path>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<RemoteFile> {
        let path = path.as_ref();
        self.logger.info(
            &format!(
                "Uploading file for user {}: {} ({})",
                user_id, file_name, mime_type
            ),
            None,
        );

        let content = match tokio::fs::read(path).await {
            Ok(content) => Bytes::from(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.logger
                    .error(&format!("File not found: {}", path.display()), None);
                return Err(GoogleDriveError::SourceNotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => {
                return Err(self.operation_failed(
                    user_id,
                    DriveOperation::Upload,
                    GoogleDriveError::ProviderOperation {
                        operation: DriveOperation::Upload,
                        message: format!("Unable to read {}: {}", path.display(), e),
                    },
                ));
            }
        };

        let file = self
            .execute_with_auth_retry(user_id, DriveOperation::Upload, |drive| {
                let content = content.clone();
                async move { drive.upload(file_name, mime_type, content).await }
            })
            .await?;

        self.logger.info(
            &format!("File uploaded successfully. File ID: {}", file.id),
            None,
        );
        Ok(file.into())
    }

    /// Make an editable Google Docs copy of `file_id`.
    ///
    /// The copy is named `"<source name> (Editable)"`, shared as writable by
    /// anyone with the link, and returned with its `edit_url` set. The three
    /// calls form one unit: a 401 on any of them retries the whole sequence.
    #[instrument(skip(self), fields(user_id = %user_id, file_id = %file_id))]
    pub async fn convert_to_editable_format(
        &self,
        user_id: &UserId,
        file_id: &str,
    ) -> Result<RemoteFile> {
        self.logger.info(
            &format!(
                "Converting file to Google Docs format. User: {}, File ID: {}",
                user_id, file_id
            ),
            None,
        );

        let converted = self
            .execute_with_auth_retry(user_id, DriveOperation::Convert, |drive| {
                self.convert_once(drive, file_id)
            })
            .await?;

        self.logger.info(
            &format!("File converted successfully. New file ID: {}", converted.id),
            None,
        );
        Ok(converted)
    }

    #[instrument(skip(self), fields(user_id = %user_id, file_id = %file_id))]
    pub async fn delete_file(&self, user_id: &UserId, file_id: &str) -> Result<()> {
        self.logger.info(
            &format!("Deleting file. User: {}, File ID: {}", user_id, file_id),
            None,
        );

        self.execute_with_auth_retry(user_id, DriveOperation::Delete, |drive| async move {
            drive.delete(file_id).await
        })
        .await?;

        self.logger
            .info(&format!("File deleted successfully: {}", file_id), None);
        Ok(())
    }

    async fn convert_once(&self, drive: DriveConnector, file_id: &str) -> Result<RemoteFile> {
        let source = drive.get_metadata(file_id).await?;
        self.logger.info(
            &format!(
                "File info: name={}, mimeType={}",
                source.name,
                source.mime_type.as_deref().unwrap_or("unknown")
            ),
            None,
        );

        let name = format!("{}{}", source.name, EDITABLE_NAME_SUFFIX);
        let copy = drive
            .copy_as(file_id, &name, GOOGLE_DOCS_MIME_TYPE)
            .await?;
        self.logger.info(
            &format!("File copied successfully. New file ID: {}", copy.id),
            None,
        );

        drive
            .create_permission(&copy.id, &Permission::anyone_writer())
            .await?;
        self.logger.info("Permissions set successfully", None);

        let view_url = copy
            .web_view_link
            .clone()
            .ok_or_else(|| GoogleDriveError::ProviderOperation {
                operation: DriveOperation::Convert,
                message: format!("copied file {} has no webViewLink", copy.id),
            })?;

        let mut converted = RemoteFile::from(copy);
        converted.edit_url = Some(derive_edit_url(&view_url));
        Ok(converted)
    }

    /// Run `call` under the single refresh-and-retry protocol.
    ///
    /// `call` is invoked at most twice, each time with a connector built
    /// from the session as it is at that moment.
    async fn execute_with_auth_retry<T, F, Fut>(
        &self,
        user_id: &UserId,
        operation: DriveOperation,
        call: F,
    ) -> Result<T>
    where
        F: Fn(DriveConnector) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.registry.refresh_if_needed(user_id).await;

        let drive = self.connector_for(user_id).await?;
        let rejected = match call(drive).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_auth_failure() => e,
            Err(e) => return Err(self.operation_failed(user_id, operation, e)),
        };

        self.logger.warn(
            &format!(
                "Authentication error during {}, attempting token refresh and retry",
                operation
            ),
            Some(&json!({
                "userId": user_id.as_str(),
                "error": { "code": rejected.status_code(), "message": rejected.to_string() },
            })),
        );

        if !self.registry.force_refresh(user_id).await {
            let message = format!("Unable to refresh token: {}", rejected);
            self.logger.error(
                &format!("Authentication failed during {}", operation),
                Some(&json!({
                    "userId": user_id.as_str(),
                    "error": { "message": message },
                })),
            );
            return Err(GoogleDriveError::AuthenticationFailed(message));
        }

        self.logger
            .info(&format!("Token refreshed, retrying {}", operation), None);

        let drive = self.connector_for(user_id).await?;
        match call(drive).await {
            Ok(value) => {
                self.logger
                    .info(&format!("{} succeeded on retry", operation), None);
                Ok(value)
            }
            Err(e) if e.is_auth_failure() => {
                self.logger.error(
                    "Authentication error: Token may be expired or invalid",
                    Some(&json!({
                        "userId": user_id.as_str(),
                        "error": { "code": e.status_code(), "message": e.to_string() },
                    })),
                );
                Err(GoogleDriveError::AuthenticationFailed(e.to_string()))
            }
            Err(e) => Err(self.operation_failed(user_id, operation, e)),
        }
    }

    async fn connector_for(&self, user_id: &UserId) -> Result<DriveConnector> {
        match self.registry.get_session(user_id).await {
            Some(session) => Ok(DriveConnector::new(
                Arc::clone(&self.http_client),
                session.access_token,
            )),
            None => {
                let error = GoogleDriveError::SessionNotInitialized {
                    user_id: user_id.to_string(),
                };
                self.logger.error(&error.to_string(), None);
                Err(error)
            }
        }
    }

    /// Log a non-auth failure and wrap it as [`GoogleDriveError::ProviderOperation`].
    fn operation_failed(
        &self,
        user_id: &UserId,
        operation: DriveOperation,
        error: GoogleDriveError,
    ) -> GoogleDriveError {
        let message = match error {
            GoogleDriveError::ProviderOperation { message, .. } => message,
            other => other.to_string(),
        };

        self.logger.error(
            &format!("Failed to {}: {}", operation, message),
            Some(&json!({ "userId": user_id.as_str(), "error": { "message": message } })),
        );

        GoogleDriveError::ProviderOperation { operation, message }
    }
}

impl std::fmt::Debug for DriveService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveService")
            .field("registry", &self.registry)
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}
