//! # Authentication Module
//!
//! Per-user credential sessions for the document provider, and the guard
//! that keeps their access tokens fresh.
//!
//! ## Overview
//!
//! - [`SessionRegistry`] owns one [`CredentialSession`] per [`UserId`].
//!   Sessions live in memory only.
//! - `refresh_if_needed` / `force_refresh` exchange the stored refresh token
//!   through [`OAuthFlowManager`], with at most one exchange in flight per
//!   user. Losing callers are skipped, not queued.
//! - Lifecycle changes are published as `AuthEvent`s when an event bus is
//!   attached.

pub mod error;
pub mod oauth;
mod refresh;
pub mod registry;
pub mod types;

pub use error::{AuthError, Result};
pub use oauth::{OAuthConfig, OAuthFlowManager, RefreshedToken};
pub use registry::{SessionPolicy, SessionRegistry};
pub use types::{CredentialSession, Credentials, UserId};
