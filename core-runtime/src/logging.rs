//! # Logging & Tracing Infrastructure
//!
//! Provides structured logging with the `tracing` crate, supporting:
//! - JSON, pretty and compact output formats
//! - Module-level filtering
//! - Secret redaction of structured payloads before they are emitted
//! - Integration with host logging via `LoggerSink`
//!
//! ## Diagnostic logger
//!
//! Core components log through a [`DiagnosticLogger`] tagged with their
//! component name. Info-level records are dropped unless debug mode is on;
//! warnings and errors always go out. Any structured payload passes through
//! [`redact`] first, so a token can never reach a subscriber or sink even
//! when the payload is an error report.
//!
//! ```ignore
//! use core_runtime::logging::DiagnosticLogger;
//! use serde_json::json;
//!
//! let logger = DiagnosticLogger::new("GoogleDriveService", config.debug_mode);
//! logger.warn(
//!     "Authentication error, attempting token refresh and retry",
//!     Some(&json!({ "userId": "u1", "accessToken": token })),
//! );
//! // data={"accessToken":"[REDACTED]","userId":"u1"}
//! ```
//!
//! ## Subscriber setup
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::time::{ConsoleLogger, LogLevel};
//! use std::sync::Arc;
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Json)
//!     .with_level(LogLevel::Debug)
//!     .with_logger_sink(Arc::new(ConsoleLogger::default()));
//!
//! init_logging(config)?;
//! ```

use crate::error::{Error, Result};

use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use serde_json::{Map, Value};

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

/// Replacement written in place of every secret value.
pub const REDACTED: &str = "[REDACTED]";

/// Keys whose values are replaced wholesale, at any depth.
pub const SENSITIVE_KEYS: &[&str] = &[
    "accessToken",
    "refreshToken",
    "access_token",
    "refresh_token",
    "idToken",
    "id_token",
    "authorization",
    "Authorization",
    "client_secret",
    "clientSecret",
    "password",
];

/// Returns a redacted deep copy of `value`.
///
/// Every object member whose key is in [`SENSITIVE_KEYS`] has its value
/// replaced by [`REDACTED`], whatever that value was. Objects nested inside
/// objects or arrays are visited too, so
/// `{"auth": {"credentials": {"access_token": "..."}}}` is covered. Null
/// values are left as null since there is nothing to leak. The input is not
/// modified.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                let redacted = if is_sensitive_key(key) && !inner.is_null() {
                    Value::String(REDACTED.to_string())
                } else {
                    redact(inner)
                };
                out.insert(key.clone(), redacted);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.contains(&key)
}

/// Component-tagged logger used by the session registry and the provider
/// operations.
#[derive(Debug, Clone)]
pub struct DiagnosticLogger {
    component: Arc<str>,
    debug: bool,
}

macro_rules! emit {
    ($level:ident, $component:expr, $message:expr, $data:expr) => {
        match $data {
            Some(data) => tracing::$level!(component = %$component, data = %data, "{}", $message),
            None => tracing::$level!(component = %$component, "{}", $message),
        }
    };
}

impl DiagnosticLogger {
    pub fn new(component: impl Into<Arc<str>>, debug: bool) -> Self {
        Self {
            component: component.into(),
            debug,
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug
    }

    /// Same logger under a different component tag.
    pub fn for_component(&self, component: impl Into<Arc<str>>) -> Self {
        Self {
            component: component.into(),
            debug: self.debug,
        }
    }

    /// Whether a record at `level` would be emitted.
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.debug || level >= LogLevel::Warn
    }

    /// Emits `message` at `level`, with `data` redacted.
    pub fn log(&self, level: LogLevel, message: &str, data: Option<&Value>) {
        if !self.enabled(level) {
            return;
        }

        let data = data.map(|value| redact(value).to_string());

        match level {
            LogLevel::Debug => emit!(debug, self.component, message, data),
            LogLevel::Info => emit!(info, self.component, message, data),
            LogLevel::Warn => emit!(warn, self.component, message, data),
            LogLevel::Error => emit!(error, self.component, message, data),
        }
    }

    pub fn info(&self, message: &str, data: Option<&Value>) {
        self.log(LogLevel::Info, message, data);
    }

    pub fn warn(&self, message: &str, data: Option<&Value>) {
        self.log(LogLevel::Warn, message, data);
    }

    pub fn error(&self, message: &str, data: Option<&Value>) {
        self.log(LogLevel::Error, message, data);
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Compact format for production
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Minimum level for workspace crates
    pub level: LogLevel,
    /// Custom filter string (e.g., "core_auth=debug,provider_google_drive=debug")
    pub filter: Option<String>,
    /// Optional logger sink for forwarding logs to host
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    pub display_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            logger_sink: None,
            display_target: true,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once during startup. Subsequent calls return an error.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let sink_layer = LoggerSinkLayer::new(config.logger_sink.clone());
    let registry = tracing_subscriber::registry().with(filter).with(sink_layer);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(config.display_target)
                    .with_writer(io::stdout),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_target(config.display_target)
                    .with_writer(io::stdout),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(config.display_target)
                    .with_writer(io::stdout),
            )
            .try_init(),
    };

    result.map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let filter_string = match &config.filter {
        Some(custom) => custom.clone(),
        None => {
            // Workspace crates at the configured level, dependencies at warn
            let level = config.level.as_str();
            let crates = [
                "drive_convert",
                "core_runtime",
                "core_auth",
                "core_service",
                "provider_google_drive",
                "bridge_desktop",
            ];
            let mut directives: Vec<String> =
                crates.iter().map(|name| format!("{}={}", name, level)).collect();
            directives.extend(["h2=warn", "hyper=warn", "reqwest=warn"].map(String::from));
            directives.join(",")
        }
    };

    EnvFilter::try_new(filter_string)
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

/// Layer that forwards events to a `LoggerSink` implementation.
struct LoggerSinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
}

impl LoggerSinkLayer {
    fn new(sink: Option<Arc<dyn LoggerSink>>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for LoggerSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        let metadata = event.metadata();
        let level = tracing_level_to_log_level(*metadata.level());

        if level < sink.min_level() {
            return;
        }

        let mut visitor = SinkVisitor::default();
        event.record(&mut visitor);

        let message = visitor
            .message
            .unwrap_or_else(|| metadata.name().to_string());
        let component = visitor
            .fields
            .remove("component")
            .unwrap_or_else(|| metadata.target().to_string());

        let mut entry = LogEntry::new(level, component, message);
        for (key, value) in visitor.fields {
            entry = entry.with_field(key, value);
        }

        let sink = Arc::clone(sink);

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(err) = sink.log(entry).await {
                    eprintln!("LoggerSink error: {}", err);
                }
            });
            return;
        }

        if let Err(err) = futures::executor::block_on(sink.log(entry)) {
            eprintln!("LoggerSink error: {}", err);
        }
    }
}

#[derive(Default)]
struct SinkVisitor {
    message: Option<String>,
    fields: HashMap<String, String>,
}

impl SinkVisitor {
    fn record_value(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for SinkVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_value(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, format!("{:?}", value));
    }
}

fn tracing_level_to_log_level(level: tracing::Level) -> LogLevel {
    match level {
        tracing::Level::TRACE | tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as SinkResult;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_redact_top_level_tokens() {
        let input = json!({
            "userId": "u1",
            "accessToken": "secret123",
            "refreshToken": "refresh456"
        });

        let out = redact(&input);

        assert_eq!(out["userId"], "u1");
        assert_eq!(out["accessToken"], REDACTED);
        assert_eq!(out["refreshToken"], REDACTED);
        // Input untouched
        assert_eq!(input["accessToken"], "secret123");
    }

    #[test]
    fn test_redact_nested_credentials_and_arrays() {
        let input = json!({
            "auth": { "credentials": { "access_token": "a", "refresh_token": "r", "scope": "drive" } },
            "attempts": [ { "accessToken": "x" }, { "status": 401 } ]
        });

        let out = redact(&input);

        assert_eq!(out["auth"]["credentials"]["access_token"], REDACTED);
        assert_eq!(out["auth"]["credentials"]["refresh_token"], REDACTED);
        assert_eq!(out["auth"]["credentials"]["scope"], "drive");
        assert_eq!(out["attempts"][0]["accessToken"], REDACTED);
        assert_eq!(out["attempts"][1]["status"], 401);
    }

    #[test]
    fn test_redact_replaces_non_string_secret_values() {
        let input = json!({ "credentials": { "accessToken": { "value": "deep" } }, "password": null });
        let out = redact(&input);

        assert_eq!(out["credentials"]["accessToken"], REDACTED);
        assert!(out["password"].is_null());
        assert!(!out.to_string().contains("deep"));
    }

    #[test]
    fn test_redact_scalars_pass_through() {
        assert_eq!(redact(&json!("plain")), json!("plain"));
        assert_eq!(redact(&json!(42)), json!(42));
        assert_eq!(redact(&Value::Null), Value::Null);
    }

    #[test]
    fn test_diagnostic_logger_level_gate() {
        let quiet = DiagnosticLogger::new("GoogleDriveService", false);
        assert!(!quiet.enabled(LogLevel::Info));
        assert!(quiet.enabled(LogLevel::Warn));
        assert!(quiet.enabled(LogLevel::Error));

        let verbose = quiet.for_component("SessionRegistry");
        assert_eq!(verbose.component(), "SessionRegistry");
        assert!(!verbose.debug_enabled());

        let verbose = DiagnosticLogger::new("GoogleDriveService", true);
        assert!(verbose.enabled(LogLevel::Info));
    }

    #[test]
    fn test_diagnostic_logger_suppresses_info_without_debug() {
        let sink = Arc::new(TestLoggerSink::default());
        let _guard = install_sink(sink.clone());

        let logger = DiagnosticLogger::new("GoogleDriveService", false);
        logger.info("Uploading file", None);
        logger.warn("No Drive client found", None);

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Warn);
        assert_eq!(entries[0].component, "GoogleDriveService");
        assert_eq!(entries[0].message, "No Drive client found");
    }

    #[test]
    fn test_diagnostic_logger_never_forwards_secrets() {
        let sink = Arc::new(TestLoggerSink::default());
        let _guard = install_sink(sink.clone());

        let logger = DiagnosticLogger::new("GoogleDriveService", true);
        logger.info("Session initialized", Some(&json!({ "accessToken": "secret123" })));
        logger.error(
            "Refresh failed",
            Some(&json!({ "error": { "credentials": { "refresh_token": "secret123" } } })),
        );

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 2);
        for entry in entries.iter() {
            let rendered = serde_json::to_string(entry).unwrap();
            assert!(!rendered.contains("secret123"), "leaked: {}", rendered);
            assert!(entry.fields["data"].contains(REDACTED));
        }
    }

    #[test]
    fn test_build_filter() {
        let config = LoggingConfig::default().with_level(LogLevel::Debug);
        let filter = build_filter(&config).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("core_auth=debug"));
        assert!(rendered.contains("reqwest=warn"));
    }

    #[test]
    fn test_build_custom_filter() {
        let config = LoggingConfig::default().with_filter("provider_google_drive=trace");
        let filter = build_filter(&config).unwrap();
        assert!(filter.to_string().contains("provider_google_drive=trace"));
    }

    #[test]
    fn test_logger_sink_layer_forwards_event() {
        let sink = Arc::new(TestLoggerSink::default());
        let _guard = install_sink(sink.clone());

        tracing::info!(target: "test.target", user = "alice", "hello world");

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.component, "test.target");
        assert_eq!(entry.message, "hello world");
        assert_eq!(entry.fields.get("user").map(String::as_str), Some("alice"));
    }

    fn install_sink(sink: Arc<TestLoggerSink>) -> tracing::subscriber::DefaultGuard {
        let trait_sink: Arc<dyn LoggerSink> = sink;
        let subscriber = tracing_subscriber::registry().with(LoggerSinkLayer::new(Some(trait_sink)));
        tracing::subscriber::set_default(subscriber)
    }

    #[derive(Default)]
    struct TestLoggerSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LoggerSink for TestLoggerSink {
        async fn log(&self, entry: LogEntry) -> SinkResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Debug
        }
    }
}
