//! Credential session registry
//!
//! Holds at most one [`CredentialSession`] per user for the lifetime of the
//! process. The registry is an explicit object: construct one at startup and
//! share it (behind an `Arc`) with everything that performs provider calls.

use crate::error::{AuthError, Result};
use crate::oauth::{OAuthConfig, OAuthFlowManager};
use crate::refresh::RefreshLocks;
use crate::types::{CredentialSession, Credentials, UserId};
use bridge_traits::Clock;
use chrono::Duration;
use core_runtime::config::CoreConfig;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use core_runtime::logging::DiagnosticLogger;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

pub(crate) const COMPONENT: &str = "SessionRegistry";

/// Timing policy for session tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Tokens expiring within this window are refreshed before use
    pub refresh_buffer: Duration,
    /// Expiry assumed when the caller does not supply one
    pub default_token_lifetime: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            refresh_buffer: core_runtime::config::default_token_refresh_buffer(),
            default_token_lifetime: core_runtime::config::default_token_lifetime(),
        }
    }
}

impl From<&CoreConfig> for SessionPolicy {
    fn from(config: &CoreConfig) -> Self {
        Self {
            refresh_buffer: config.token_refresh_buffer,
            default_token_lifetime: config.default_token_lifetime,
        }
    }
}

pub struct SessionRegistry {
    pub(crate) sessions: RwLock<HashMap<UserId, CredentialSession>>,
    pub(crate) refresh_locks: RefreshLocks,
    pub(crate) oauth: OAuthFlowManager,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) policy: SessionPolicy,
    pub(crate) logger: DiagnosticLogger,
    event_bus: Option<EventBus>,
}

impl SessionRegistry {
    pub fn new(oauth: OAuthFlowManager, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            refresh_locks: RefreshLocks::default(),
            oauth,
            clock,
            policy: SessionPolicy::default(),
            logger: DiagnosticLogger::new(COMPONENT, false),
            event_bus: None,
        }
    }

    /// Registry wired from a validated configuration.
    pub fn from_config(config: &CoreConfig) -> Self {
        let oauth = OAuthFlowManager::new(
            OAuthConfig::from(&config.oauth),
            Arc::clone(&config.http_client),
            Arc::clone(&config.clock),
        );

        Self::new(oauth, Arc::clone(&config.clock))
            .with_policy(SessionPolicy::from(config))
            .with_logger(DiagnosticLogger::new(COMPONENT, config.debug_mode))
    }

    pub fn with_policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_logger(mut self, logger: DiagnosticLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Create or replace the session for `user_id`.
    ///
    /// An existing session is overwritten, including its refresh token. A
    /// missing expiry is assumed to be `now + default_token_lifetime`.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] if the access token is empty.
    #[instrument(skip(self, credentials), fields(user_id = %user_id))]
    pub async fn init_session(
        &self,
        user_id: &UserId,
        credentials: Credentials,
    ) -> Result<CredentialSession> {
        self.install(user_id, credentials, false).await
    }

    /// Like [`init_session`](Self::init_session), but keeps the stored
    /// refresh token when `credentials` carries none.
    #[instrument(skip(self, credentials), fields(user_id = %user_id))]
    pub async fn init_session_preserving_refresh(
        &self,
        user_id: &UserId,
        credentials: Credentials,
    ) -> Result<CredentialSession> {
        self.install(user_id, credentials, true).await
    }

    async fn install(
        &self,
        user_id: &UserId,
        credentials: Credentials,
        preserve_refresh: bool,
    ) -> Result<CredentialSession> {
        self.logger.info(
            &format!("Initializing session for user: {}", user_id),
            None,
        );

        if credentials.access_token.is_empty() {
            let message = "accessToken is required";
            self.logger.error(
                &format!("Invalid credentials: {}", message),
                Some(&json!({
                    "userId": user_id.as_str(),
                    "credentials": serde_json::to_value(&credentials).unwrap_or_default(),
                })),
            );
            return Err(AuthError::InvalidCredentials(message.to_string()));
        }

        let expiry = credentials
            .expiry_date
            .unwrap_or_else(|| self.clock.now() + self.policy.default_token_lifetime);

        let session = {
            let mut sessions = self.sessions.write().await;

            let refresh_token = match credentials.refresh_token {
                Some(token) => Some(token),
                None if preserve_refresh => sessions
                    .get(user_id)
                    .and_then(|existing| existing.refresh_token.clone()),
                None => None,
            };

            let session = CredentialSession {
                user_id: user_id.clone(),
                access_token: credentials.access_token,
                refresh_token,
                expiry: Some(expiry),
            };
            sessions.insert(user_id.clone(), session.clone());
            session
        };

        self.logger.info(
            &format!("Session stored for user {}", user_id),
            Some(&json!({
                "hasRefreshToken": session.has_refresh_token(),
                "expiryDate": expiry.timestamp_millis(),
            })),
        );

        self.emit(AuthEvent::SessionInitialized {
            user_id: user_id.to_string(),
            has_refresh_token: session.has_refresh_token(),
        });

        Ok(session)
    }

    /// Current session for `user_id`, if one was initialized.
    pub async fn get_session(&self, user_id: &UserId) -> Option<CredentialSession> {
        self.sessions.read().await.get(user_id).cloned()
    }

    /// Drop the session for `user_id`. Returns whether one existed.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn end_session(&self, user_id: &UserId) -> bool {
        let removed = self.sessions.write().await.remove(user_id).is_some();

        if removed {
            self.logger
                .info(&format!("Session ended for user: {}", user_id), None);
            self.emit(AuthEvent::SessionEnded {
                user_id: user_id.to_string(),
            });
        }

        removed
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub(crate) fn emit(&self, event: AuthEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Auth(event));
        }
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("policy", &self.policy)
            .field("oauth", self.oauth.config())
            .finish_non_exhaustive()
    }
}
