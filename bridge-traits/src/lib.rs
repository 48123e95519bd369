//! # Host Bridge Traits
//!
//! Capability seams between the conversion core and the host it runs in.
//!
//! ## Overview
//!
//! The core never talks to the network, the wall clock, or the host's log
//! pipeline directly. Each of those is a trait here so the host can inject
//! its own implementation and tests can inject deterministic ones:
//!
//! - [`HttpClient`](http::HttpClient) - executes requests against the
//!   document-storage provider and its token endpoint
//! - [`Clock`](time::Clock) - time source for token expiry decisions
//! - [`LoggerSink`](time::LoggerSink) - receives structured log entries
//!
//! ## Error Handling
//!
//! All bridges report failures through [`BridgeError`](error::BridgeError).
//! A bridge only fails when the capability itself failed (connection refused,
//! TLS error). A provider answering with a 4xx/5xx status is a successful
//! bridge call carrying that status; interpreting it is the caller's job.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single instance can be shared
//! across tasks behind an `Arc`.

pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
