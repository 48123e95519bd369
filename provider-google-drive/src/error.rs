//! Error types for Google Drive provider

use crate::types::DriveOperation;
use core_auth::AuthError;
use std::path::PathBuf;
use thiserror::Error;

/// Google Drive provider errors
///
/// The first five variants are what [`DriveService`](crate::DriveService)
/// surfaces. `ApiError`, `ParseError` and `BridgeError` come out of the raw
/// [`DriveConnector`](crate::DriveConnector) calls and are classified by the
/// service before they reach a caller.
#[derive(Error, Debug)]
pub enum GoogleDriveError {
    /// Session registry rejected the request (e.g. empty access token)
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Operation attempted for a user with no session
    #[error("Drive client not initialized for user: {user_id}")]
    SessionNotInitialized { user_id: String },

    /// Upload source missing on local disk
    #[error("File not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// Token rejected and the refresh-then-retry did not recover
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Any other failure of an operation
    #[error("Failed to {operation}: {message}")]
    ProviderOperation {
        operation: DriveOperation,
        message: String,
    },

    /// API request returned a non-2xx status
    #[error("Google Drive API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Transport failure from the host HTTP client
    #[error(transparent)]
    BridgeError(#[from] bridge_traits::error::BridgeError),
}

/// Result type for Google Drive operations
pub type Result<T> = std::result::Result<T, GoogleDriveError>;

/// Caller-facing classification of a [`GoogleDriveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveErrorKind {
    InvalidCredentials,
    SessionNotInitialized,
    SourceNotFound,
    AuthenticationFailed,
    ProviderOperation,
}

impl GoogleDriveError {
    pub fn kind(&self) -> DriveErrorKind {
        match self {
            GoogleDriveError::Auth(AuthError::InvalidCredentials(_)) => {
                DriveErrorKind::InvalidCredentials
            }
            GoogleDriveError::Auth(_) | GoogleDriveError::AuthenticationFailed(_) => {
                DriveErrorKind::AuthenticationFailed
            }
            GoogleDriveError::SessionNotInitialized { .. } => DriveErrorKind::SessionNotInitialized,
            GoogleDriveError::SourceNotFound { .. } => DriveErrorKind::SourceNotFound,
            GoogleDriveError::ApiError { status_code, .. } if *status_code == 401 => {
                DriveErrorKind::AuthenticationFailed
            }
            GoogleDriveError::ProviderOperation { .. }
            | GoogleDriveError::ApiError { .. }
            | GoogleDriveError::ParseError(_)
            | GoogleDriveError::BridgeError(_) => DriveErrorKind::ProviderOperation,
        }
    }

    /// Whether the provider rejected the access token itself.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, GoogleDriveError::ApiError { status_code: 401, .. })
    }

    /// Status code of the underlying API response, if there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GoogleDriveError::ApiError { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}
