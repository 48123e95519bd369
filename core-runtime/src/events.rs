//! # Event Bus System
//!
//! Broadcast channel for session lifecycle events, built on
//! `tokio::sync::broadcast`.
//!
//! ```rust
//! use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
//!
//! let event_bus = EventBus::new(16);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Auth(AuthEvent::SessionEnded {
//!         user_id: "user-123".to_string(),
//!     }))
//!     .ok();
//!
//! assert!(matches!(receiver.try_recv(), Ok(CoreEvent::Auth(_))));
//! ```
//!
//! Emitting with no subscribers returns `Err(SendError)`. Publishers in this
//! workspace ignore that error: events are informational and nobody is
//! required to listen.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Auth(AuthEvent),
}

impl CoreEvent {
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
        }
    }
}

/// Credential session lifecycle.
///
/// Payloads never carry token material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// A session was created or replaced.
    SessionInitialized {
        user_id: String,
        has_refresh_token: bool,
    },
    /// A refresh exchange has started for this user.
    TokenRefreshing { user_id: String },
    /// A refresh exchange completed and the session was updated.
    TokenRefreshed {
        user_id: String,
        /// New expiry, Unix milliseconds
        expires_at: i64,
    },
    /// A refresh exchange failed.
    AuthError { user_id: String, message: String },
    /// The session was removed.
    SessionEnded { user_id: String },
}

impl AuthEvent {
    pub fn description(&self) -> &str {
        match self {
            AuthEvent::SessionInitialized { .. } => "Credential session initialized",
            AuthEvent::TokenRefreshing { .. } => "Refreshing access token",
            AuthEvent::TokenRefreshed { .. } => "Access token refreshed",
            AuthEvent::AuthError { .. } => "Authentication error",
            AuthEvent::SessionEnded { .. } => "Credential session ended",
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            AuthEvent::SessionInitialized { user_id, .. }
            | AuthEvent::TokenRefreshing { user_id }
            | AuthEvent::TokenRefreshed { user_id, .. }
            | AuthEvent::AuthError { user_id, .. }
            | AuthEvent::SessionEnded { user_id } => user_id,
        }
    }
}

/// Central broadcast channel. Cloning shares the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// `capacity` is the per-subscriber buffer; slower subscribers receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns the number of subscribers that received the event.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}
