//! # Desktop Bridge Implementations
//!
//! Default implementations of the bridge traits for server and desktop
//! hosts (macOS, Windows, Linux).
//!
//! - `HttpClient` using `reqwest` with rustls
//!
//! `Clock` and `LoggerSink` defaults (`SystemClock`, `ConsoleLogger`) live in
//! `bridge-traits` because they have no platform dependency.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new()?);
//! let config = CoreConfig::builder()
//!     .http_client(http_client)
//!     // ...
//!     .build()?;
//! ```

mod http;

pub use http::ReqwestHttpClient;
