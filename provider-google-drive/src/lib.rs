//! # Google Drive Provider
//!
//! Upload, convert and delete operations against the Google Drive API v3,
//! run on behalf of a user whose credential session lives in a
//! [`SessionRegistry`](core_auth::SessionRegistry).
//!
//! ## Overview
//!
//! - [`DriveConnector`] issues the raw Drive v3 calls with one access token.
//! - [`DriveService`] wraps every operation in the same protocol: refresh
//!   the token if it is about to expire, make the call, and on a 401 force
//!   one refresh and retry exactly once.
//! - [`derive_edit_url`] turns a document's view link into its edit link.

pub mod connector;
pub mod error;
pub mod service;
pub mod types;

pub use connector::DriveConnector;
pub use error::{DriveErrorKind, GoogleDriveError, Result};
pub use service::{derive_edit_url, DriveService};
pub use types::{DriveFile, DriveOperation, Permission, RemoteFile};
