//! # Core Configuration Module
//!
//! Provides configuration management for the conversion core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the OAuth client settings, the session policy knobs and
//! the injected bridges. It enforces fail-fast validation so a misconfigured
//! process refuses to start instead of failing on the first user request.
//!
//! ## Required Settings
//!
//! - OAuth client id, client secret and redirect URI
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest)
//! - `Clock` - time source for expiry decisions (default: system clock)
//! - `LoggerSink` - host log pipeline (default: none)
//!
//! When the `desktop-shims` feature is enabled, a reqwest-backed
//! `HttpClient` is injected automatically if none is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .client_id("1234.apps.googleusercontent.com")
//!     .client_secret("shh")
//!     .redirect_uri("http://localhost:3000/auth/callback")
//!     .build()?;
//!
//! // or, from GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET / GOOGLE_REDIRECT_URI
//! let config = CoreConfig::from_env()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient, LoggerSink, SystemClock};
use chrono::Duration;
use std::path::PathBuf;
use std::sync::Arc;

pub const ENV_CLIENT_ID: &str = "GOOGLE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "GOOGLE_CLIENT_SECRET";
pub const ENV_REDIRECT_URI: &str = "GOOGLE_REDIRECT_URI";
pub const ENV_DEBUG_MODE: &str = "DEBUG_MODE";

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Tokens expiring within this window are refreshed before use.
pub fn default_token_refresh_buffer() -> Duration {
    Duration::minutes(5)
}

/// Assumed lifetime of an access token whose expiry the caller did not supply.
pub fn default_token_lifetime() -> Duration {
    Duration::hours(1)
}

/// OAuth client registration used for the refresh-token exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthClientSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub token_url: String,
}

impl std::fmt::Debug for OAuthClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClientSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// Core configuration for the conversion core.
///
/// Use [`CoreConfigBuilder`] or [`CoreConfig::from_env`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    pub oauth: OAuthClientSettings,

    /// Emit info-level diagnostics. Warnings and errors are always emitted.
    pub debug_mode: bool,

    pub token_refresh_buffer: Duration,

    pub default_token_lifetime: Duration,

    /// Directory uploaded documents are staged in before being sent on
    pub upload_dir: PathBuf,

    pub max_upload_bytes: u64,

    pub http_client: Arc<dyn HttpClient>,

    pub clock: Arc<dyn Clock>,

    pub logger_sink: Option<Arc<dyn LoggerSink>>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("oauth", &self.oauth)
            .field("debug_mode", &self.debug_mode)
            .field("token_refresh_buffer", &self.token_refresh_buffer)
            .field("default_token_lifetime", &self.default_token_lifetime)
            .field("upload_dir", &self.upload_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("http_client", &"HttpClient { ... }")
            .field("clock", &"Clock { ... }")
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Builds a configuration from the process environment.
    ///
    /// `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET` and `GOOGLE_REDIRECT_URI` are
    /// required; `DEBUG_MODE=true` enables info-level diagnostics.
    ///
    /// # Errors
    ///
    /// [`Error::MissingEnvironment`] naming every required variable that is
    /// unset or empty, or any error from [`CoreConfigBuilder::build`].
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable lookup.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::builder_from_env_with(lookup)?.build()
    }

    /// Reads the environment into a builder so callers can inject bridges
    /// before validation.
    pub fn builder_from_env_with<F>(lookup: F) -> Result<CoreConfigBuilder>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let client_id = read(ENV_CLIENT_ID);
        let client_secret = read(ENV_CLIENT_SECRET);
        let redirect_uri = read(ENV_REDIRECT_URI);

        let missing: Vec<String> = [
            (ENV_CLIENT_ID, client_id.is_none()),
            (ENV_CLIENT_SECRET, client_secret.is_none()),
            (ENV_REDIRECT_URI, redirect_uri.is_none()),
        ]
        .into_iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| name.to_string())
        .collect();

        if !missing.is_empty() {
            return Err(Error::MissingEnvironment(missing));
        }

        let mut builder = CoreConfig::builder()
            .debug_mode(lookup(ENV_DEBUG_MODE).as_deref() == Some("true"));
        if let Some(value) = client_id {
            builder = builder.client_id(value);
        }
        if let Some(value) = client_secret {
            builder = builder.client_secret(value);
        }
        if let Some(value) = redirect_uri {
            builder = builder.redirect_uri(value);
        }

        Ok(builder)
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.oauth.client_id.trim().is_empty() {
            return Err(Error::Config("OAuth client id cannot be empty".to_string()));
        }

        if self.oauth.client_secret.trim().is_empty() {
            return Err(Error::Config(
                "OAuth client secret cannot be empty".to_string(),
            ));
        }

        if self.oauth.redirect_uri.trim().is_empty() {
            return Err(Error::Config(
                "OAuth redirect URI cannot be empty".to_string(),
            ));
        }

        if !self.oauth.token_url.starts_with("https://")
            && !self.oauth.token_url.starts_with("http://")
        {
            return Err(Error::Config(format!(
                "OAuth token URL must be an http(s) URL, got '{}'",
                self.oauth.token_url
            )));
        }

        if self.token_refresh_buffer <= Duration::zero() {
            return Err(Error::Config(
                "Token refresh buffer must be greater than zero".to_string(),
            ));
        }

        if self.default_token_lifetime <= Duration::zero() {
            return Err(Error::Config(
                "Default token lifetime must be greater than zero".to_string(),
            ));
        }

        if self.upload_dir.as_os_str().is_empty() {
            return Err(Error::Config("Upload directory cannot be empty".to_string()));
        }

        if self.max_upload_bytes == 0 {
            return Err(Error::Config(
                "Maximum upload size must be greater than 0 bytes".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: format!("Default reqwest client could not be created: {}", e),
    })?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to reach the document provider. \
                 Enable the 'desktop-shims' feature to use the default ReqwestHttpClient \
                 or inject one with .http_client()."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    token_url: Option<String>,
    debug_mode: bool,
    token_refresh_buffer: Option<Duration>,
    default_token_lifetime: Option<Duration>,
    upload_dir: Option<PathBuf>,
    max_upload_bytes: Option<u64>,
    http_client: Option<Arc<dyn HttpClient>>,
    clock: Option<Arc<dyn Clock>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
}

impl CoreConfigBuilder {
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Overrides the token endpoint. Default: Google's OAuth 2.0 endpoint.
    pub fn token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = Some(token_url.into());
        self
    }

    pub fn debug_mode(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    /// Default: 5 minutes
    pub fn token_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.token_refresh_buffer = Some(buffer);
        self
    }

    /// Default: 1 hour
    pub fn default_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.default_token_lifetime = Some(lifetime);
        self
    }

    /// Default: `uploads`
    pub fn upload_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.upload_dir = Some(path.into());
        self
    }

    /// Default: 10 MiB
    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = Some(bytes);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - a required OAuth setting was not provided
    /// - no `HttpClient` was injected and no platform default is available
    /// - [`CoreConfig::validate`] rejected a value
    pub fn build(self) -> Result<CoreConfig> {
        let client_id = self.client_id.ok_or_else(|| {
            Error::Config("OAuth client id is required. Use .client_id() to set it.".to_string())
        })?;

        let client_secret = self.client_secret.ok_or_else(|| {
            Error::Config(
                "OAuth client secret is required. Use .client_secret() to set it.".to_string(),
            )
        })?;

        let redirect_uri = self.redirect_uri.ok_or_else(|| {
            Error::Config(
                "OAuth redirect URI is required. Use .redirect_uri() to set it.".to_string(),
            )
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let config = CoreConfig {
            oauth: OAuthClientSettings {
                client_id,
                client_secret,
                redirect_uri,
                token_url: self
                    .token_url
                    .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            },
            debug_mode: self.debug_mode,
            token_refresh_buffer: self
                .token_refresh_buffer
                .unwrap_or_else(default_token_refresh_buffer),
            default_token_lifetime: self
                .default_token_lifetime
                .unwrap_or_else(default_token_lifetime),
            upload_dir: self
                .upload_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            max_upload_bytes: self.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            http_client,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            logger_sink: self.logger_sink,
        };

        config.validate()?;

        Ok(config)
    }
}
