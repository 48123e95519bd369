use provider_google_drive::{DriveErrorKind, GoogleDriveError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error(transparent)]
    Drive(#[from] GoogleDriveError),

    #[error("Invalid file type {mime_type} for {file_name}. Only PDF, DOCX, and TXT files are allowed.")]
    UnsupportedDocumentType { file_name: String, mime_type: String },

    #[error("File too large ({size} bytes). Maximum size is {limit} bytes.")]
    DocumentTooLarge { size: u64, limit: u64 },

    #[error("Upload directory {} unavailable: {source}", path.display())]
    UploadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    /// HTTP status a host should answer with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            CoreError::Drive(error) => match error.kind() {
                DriveErrorKind::InvalidCredentials
                | DriveErrorKind::SessionNotInitialized
                | DriveErrorKind::AuthenticationFailed => 401,
                DriveErrorKind::SourceNotFound => 404,
                DriveErrorKind::ProviderOperation => 500,
            },
            CoreError::UnsupportedDocumentType { .. } | CoreError::DocumentTooLarge { .. } => 400,
            CoreError::Config(_) | CoreError::UploadDir { .. } => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
