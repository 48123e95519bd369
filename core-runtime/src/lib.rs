//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the conversion core:
//! - Configuration (`CoreConfig` builder and environment loading)
//! - Structured diagnostic logging with secret redaction
//! - Auth event bus
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its settings, for the
//! `DiagnosticLogger` it tags its log lines with, and for the broadcast
//! channel session lifecycle events are published on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
