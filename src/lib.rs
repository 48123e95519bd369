//! Workspace facade crate.
//!
//! Host applications depend on `drive-convert` and get the document
//! conversion facade from `core-service` without wiring each workspace crate
//! individually. The HTTP layer that extracts user identity and bearer tokens
//! lives in the host, not here.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
