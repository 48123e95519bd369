//! Token refresh guard
//!
//! At most one refresh exchange runs per user. A caller that finds a refresh
//! already in flight for its user is turned away immediately rather than
//! queued: it proceeds with the token it has, and the expiring window keeps
//! that token usable in the common case.

use crate::registry::SessionRegistry;
use crate::types::UserId;
use core_runtime::events::AuthEvent;
use dashmap::DashSet;
use serde_json::json;
use tracing::instrument;

/// Users with a refresh exchange in flight.
#[derive(Debug, Default)]
pub(crate) struct RefreshLocks {
    in_progress: DashSet<UserId>,
}

impl RefreshLocks {
    /// Marks `user_id` as refreshing. Returns `None` if it already was.
    ///
    /// The check and the mark are one atomic `insert`.
    pub(crate) fn try_acquire(&self, user_id: &UserId) -> Option<RefreshGuard<'_>> {
        if self.in_progress.insert(user_id.clone()) {
            Some(RefreshGuard {
                locks: self,
                user_id: user_id.clone(),
            })
        } else {
            None
        }
    }

    pub(crate) fn is_locked(&self, user_id: &UserId) -> bool {
        self.in_progress.contains(user_id)
    }
}

/// Clears the in-progress mark when dropped, whatever the outcome.
pub(crate) struct RefreshGuard<'a> {
    locks: &'a RefreshLocks,
    user_id: UserId,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.locks.in_progress.remove(&self.user_id);
    }
}

impl SessionRegistry {
    /// Refresh the user's access token if it is about to expire.
    ///
    /// Returns `true` only when a refresh exchange ran and the session was
    /// updated. Returns `false`, without a network call, when there is no
    /// session, no refresh token, the token is not expiring, or another
    /// refresh for this user is in flight. A failed exchange is logged and
    /// also reported as `false`.
    pub async fn refresh_if_needed(&self, user_id: &UserId) -> bool {
        self.refresh(user_id, false).await
    }

    /// Refresh regardless of the recorded expiry.
    ///
    /// Used after the provider rejected the current token. The session,
    /// refresh-token and in-flight checks still apply.
    pub async fn force_refresh(&self, user_id: &UserId) -> bool {
        self.refresh(user_id, true).await
    }

    pub fn is_refresh_in_progress(&self, user_id: &UserId) -> bool {
        self.refresh_locks.is_locked(user_id)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn refresh(&self, user_id: &UserId, force: bool) -> bool {
        let Some(session) = self.get_session(user_id).await else {
            self.logger
                .warn(&format!("No session found for user: {}", user_id), None);
            return false;
        };

        let Some(refresh_token) = session.refresh_token.clone() else {
            self.logger.warn(
                &format!("No refresh token available for user: {}", user_id),
                None,
            );
            return false;
        };

        if !force && !session.is_expiring(self.clock.now(), self.policy.refresh_buffer) {
            return false;
        }

        let Some(_guard) = self.refresh_locks.try_acquire(user_id) else {
            self.logger.info(
                &format!("Token refresh already in progress for user: {}", user_id),
                None,
            );
            return false;
        };

        self.logger
            .info(&format!("Refreshing access token for user: {}", user_id), None);
        self.emit(AuthEvent::TokenRefreshing {
            user_id: user_id.to_string(),
        });

        let refreshed = match self.oauth.refresh_access_token(&refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                self.logger.error(
                    &format!("Failed to refresh token for user: {}", user_id),
                    Some(&json!({ "error": { "message": e.to_string() } })),
                );
                self.emit(AuthEvent::AuthError {
                    user_id: user_id.to_string(),
                    message: e.to_string(),
                });
                return false;
            }
        };

        let expires_at = refreshed.expires_at;
        {
            let mut sessions = self.sessions.write().await;
            let Some(stored) = sessions.get_mut(user_id) else {
                self.logger.warn(
                    &format!(
                        "Session for user {} ended during refresh; discarding new token",
                        user_id
                    ),
                    None,
                );
                return false;
            };

            stored.access_token = refreshed.access_token;
            stored.expiry = Some(expires_at);
            if let Some(rotated) = refreshed.refresh_token {
                stored.refresh_token = Some(rotated);
            }
        }

        self.logger.info(
            &format!("Token refreshed successfully for user: {}", user_id),
            Some(&json!({ "expiryDate": expires_at.timestamp_millis() })),
        );
        self.emit(AuthEvent::TokenRefreshed {
            user_id: user_id.to_string(),
            expires_at: expires_at.timestamp_millis(),
        });

        true
    }
}
