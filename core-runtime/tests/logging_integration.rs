//! Integration tests for the diagnostic logger and redaction

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{redact, DiagnosticLogger, LogFormat, LoggingConfig, REDACTED};
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for CollectingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

#[test]
fn test_logging_config_chaining() {
    let sink: Arc<dyn LoggerSink> = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_filter("core_auth=debug")
        .with_target(false)
        .with_logger_sink(sink);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert_eq!(config.filter.as_deref(), Some("core_auth=debug"));
    assert!(!config.display_target);
    assert!(config.logger_sink.is_some());
}

#[test]
fn test_redaction_is_a_deep_copy() {
    let original = json!({
        "userId": "u1",
        "credentials": { "accessToken": "tok1", "refreshToken": "ref1", "expiryDate": 1700000000000u64 }
    });

    let redacted = redact(&original);

    assert_eq!(redacted["credentials"]["accessToken"], REDACTED);
    assert_eq!(redacted["credentials"]["refreshToken"], REDACTED);
    assert_eq!(redacted["credentials"]["expiryDate"], 1700000000000u64);
    assert_eq!(original["credentials"]["accessToken"], "tok1");
}

#[test]
fn test_redaction_covers_header_and_client_secret() {
    let redacted = redact(&json!({
        "request": { "headers": { "Authorization": "Bearer abc", "Accept": "application/json" } },
        "oauth": { "client_secret": "shh", "client_id": "public" }
    }));

    assert_eq!(redacted["request"]["headers"]["Authorization"], REDACTED);
    assert_eq!(redacted["request"]["headers"]["Accept"], "application/json");
    assert_eq!(redacted["oauth"]["client_secret"], REDACTED);
    assert_eq!(redacted["oauth"]["client_id"], "public");
}

#[test]
fn test_secret_never_reaches_subscriber() {
    let buffer = Arc::new(Mutex::new(Vec::<u8>::new()));
    let writer_buffer = Arc::clone(&buffer);
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || BufferWriter(Arc::clone(&writer_buffer)))
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let logger = DiagnosticLogger::new("GoogleDriveService", true);
    logger.error(
        "Invalid credentials: accessToken is required",
        Some(&json!({ "credentials": { "accessToken": "secret123" } })),
    );
    logger.info("Session initialized", Some(&json!({ "accessToken": "secret123" })));

    let output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
    assert!(output.contains("GoogleDriveService"));
    assert!(output.contains(REDACTED));
    assert!(!output.contains("secret123"));
}

struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
