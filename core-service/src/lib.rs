//! Core service façade and bootstrap helpers.
//!
//! [`CoreService`] wires a validated [`CoreConfig`] into one session
//! registry and one Drive service, and exposes the document workflow a host
//! HTTP layer needs: validate an incoming upload, convert a staged document
//! into an editable Google Docs copy, and discard a document.
//!
//! The host owns identity and routing. It verifies the caller, extracts the
//! bearer token from the `Authorization` header and passes both in; nothing
//! here parses headers or tokens.
//!
//! Desktop hosts typically enable the `desktop-shims` feature so that
//! [`CoreService::from_env`] can fall back to the reqwest-backed HTTP client.

pub mod documents;
pub mod error;

pub use core_auth::{CredentialSession, Credentials, SessionRegistry, UserId};
pub use core_runtime::config::CoreConfig;
pub use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
pub use documents::{
    ensure_upload_dir, is_allowed_upload_type, mime_type_for, remove_local_file,
    unique_file_name, LocalDocument,
};
pub use error::{CoreError, Result};
pub use provider_google_drive::{DriveErrorKind, DriveService, GoogleDriveError, RemoteFile};

use bridge_traits::Clock;
use core_runtime::logging::DiagnosticLogger;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::instrument;

const COMPONENT: &str = "CoreService";

/// Non-secret summary of the active configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub redirect_uri: String,
    pub client_id_configured: bool,
    pub client_secret_configured: bool,
    pub debug_mode: bool,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
}

/// Result of [`CoreService::convert_document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOutcome {
    /// The original document as uploaded
    pub uploaded: RemoteFile,
    /// The editable Google Docs copy
    pub converted: RemoteFile,
    pub edit_url: String,
}

/// Result of [`CoreService::discard_document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscardOutcome {
    pub local_removed: bool,
    /// `None` when there was no remote copy to delete
    pub remote_deleted: Option<bool>,
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    registry: Arc<SessionRegistry>,
    drive: Arc<DriveService>,
    logger: DiagnosticLogger,
}

impl CoreService {
    /// Create a new service from a configuration.
    ///
    /// # Errors
    ///
    /// [`CoreError::Config`] if the configuration does not validate.
    pub fn new(config: CoreConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Like [`new`](Self::new), publishing session lifecycle events on `event_bus`.
    pub fn with_event_bus(config: CoreConfig, event_bus: EventBus) -> Result<Self> {
        Self::build(config, Some(event_bus))
    }

    /// Configuration from `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`,
    /// `GOOGLE_REDIRECT_URI` and `DEBUG_MODE`.
    pub fn from_env() -> Result<Self> {
        Self::new(CoreConfig::from_env()?)
    }

    fn build(config: CoreConfig, event_bus: Option<EventBus>) -> Result<Self> {
        config.validate()?;

        let mut registry = SessionRegistry::from_config(&config);
        if let Some(bus) = event_bus {
            registry = registry.with_event_bus(bus);
        }
        let registry = Arc::new(registry);

        let drive = DriveService::new(
            Arc::clone(&registry),
            Arc::clone(&config.http_client),
            config.debug_mode,
        );

        let service = Self {
            logger: DiagnosticLogger::new(COMPONENT, config.debug_mode),
            config: Arc::new(config),
            registry,
            drive: Arc::new(drive),
        };

        let summary = service.describe();
        service.logger.info(
            "Google Drive service configured",
            serde_json::to_value(&summary).ok().as_ref(),
        );

        Ok(service)
    }

    pub fn describe(&self) -> ServiceSummary {
        ServiceSummary {
            redirect_uri: self.config.oauth.redirect_uri.clone(),
            client_id_configured: !self.config.oauth.client_id.is_empty(),
            client_secret_configured: !self.config.oauth.client_secret.is_empty(),
            debug_mode: self.config.debug_mode,
            upload_dir: self.config.upload_dir.clone(),
            max_upload_bytes: self.config.max_upload_bytes,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn drive(&self) -> &DriveService {
        &self.drive
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Collision-free staged name for an upload, stamped with the configured clock.
    pub fn staged_file_name(&self, original: &str) -> String {
        unique_file_name(original, self.config.clock.now())
    }

    /// Check an incoming upload against the allow-list and size limit.
    ///
    /// `mime_type` is the type the client declared for the file.
    pub fn validate_upload(&self, file_name: &str, mime_type: &str, size: u64) -> Result<()> {
        if !is_allowed_upload_type(mime_type) {
            self.logger.warn(
                &format!("File type validation failed for: {}", file_name),
                Some(&json!({ "mimeType": mime_type })),
            );
            return Err(CoreError::UnsupportedDocumentType {
                file_name: file_name.to_string(),
                mime_type: mime_type.to_string(),
            });
        }

        let limit = self.config.max_upload_bytes;
        if size > limit {
            self.logger.warn(
                &format!("File too large: {}", file_name),
                Some(&json!({ "size": size, "limit": limit })),
            );
            return Err(CoreError::DocumentTooLarge { size, limit });
        }

        Ok(())
    }

    /// Upload a staged document and convert it to an editable Google Doc.
    ///
    /// The session is (re)initialized from `bearer_token` first. A refresh
    /// token stored by an earlier sign-in is kept.
    #[instrument(skip(self, bearer_token, document), fields(user_id = %user_id, file_name = %document.file_name))]
    pub async fn convert_document(
        &self,
        user_id: &UserId,
        bearer_token: &str,
        document: &LocalDocument,
    ) -> Result<ConversionOutcome> {
        self.registry
            .init_session_preserving_refresh(user_id, Credentials::new(bearer_token))
            .await
            .map_err(GoogleDriveError::from)?;

        let mime_type = document.mime_type();
        self.logger.info(
            "Uploading document for conversion",
            Some(&json!({
                "path": document.path.display().to_string(),
                "name": document.file_name,
                "mimeType": mime_type,
            })),
        );

        let uploaded = self
            .drive
            .upload_file(user_id, &document.path, &document.file_name, mime_type)
            .await?;

        let converted = self
            .drive
            .convert_to_editable_format(user_id, &uploaded.id)
            .await?;

        let edit_url = converted
            .edit_url
            .clone()
            .unwrap_or_default();

        self.logger.info(
            &format!("Document converted successfully with ID: {}", converted.id),
            Some(&json!({ "editUrl": edit_url })),
        );

        Ok(ConversionOutcome {
            uploaded,
            converted,
            edit_url,
        })
    }

    /// Remove a staged document and, if it was converted, its remote copy.
    ///
    /// Both steps are best effort: a failed remote deletion is logged and
    /// reported in the outcome, never returned as an error.
    #[instrument(skip(self, bearer_token, document), fields(user_id = %user_id))]
    pub async fn discard_document(
        &self,
        user_id: &UserId,
        bearer_token: Option<&str>,
        document: &LocalDocument,
        remote_file_id: Option<&str>,
    ) -> DiscardOutcome {
        let local_removed = remove_local_file(&document.path).await;

        let remote_deleted = match remote_file_id {
            None => None,
            Some(file_id) => Some(self.delete_remote(user_id, bearer_token, file_id).await),
        };

        DiscardOutcome {
            local_removed,
            remote_deleted,
        }
    }

    async fn delete_remote(
        &self,
        user_id: &UserId,
        bearer_token: Option<&str>,
        file_id: &str,
    ) -> bool {
        if let Some(token) = bearer_token {
            if let Err(e) = self
                .registry
                .init_session_preserving_refresh(user_id, Credentials::new(token))
                .await
            {
                self.logger.warn(
                    "Continuing with document deletion despite Google Drive error",
                    Some(&json!({ "error": { "message": e.to_string() } })),
                );
                return false;
            }
        }

        match self.drive.delete_file(user_id, file_id).await {
            Ok(()) => true,
            Err(e) => {
                self.logger.warn(
                    "Continuing with document deletion despite Google Drive error",
                    Some(&json!({ "fileId": file_id, "error": { "message": e.to_string() } })),
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
