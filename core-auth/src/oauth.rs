//! OAuth 2.0 refresh-token exchange (RFC 6749 section 6)
//!
//! The host performs the interactive sign-in; this core only ever holds the
//! resulting tokens and exchanges a refresh token for a new access token.
//!
//! Exactly one token-endpoint call is made per exchange. A failed exchange
//! is reported to the caller, which decides what to do with it.
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::{OAuthConfig, OAuthFlowManager};
//! use bridge_traits::SystemClock;
//! use std::sync::Arc;
//!
//! # async fn example() -> core_auth::Result<()> {
//! # use bridge_traits::http::HttpClient;
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! let config = OAuthConfig {
//!     client_id: "your-client-id".to_string(),
//!     client_secret: Some("your-client-secret".to_string()),
//!     redirect_uri: "http://localhost:3000/auth/callback".to_string(),
//!     token_url: "https://oauth2.googleapis.com/token".to_string(),
//! };
//!
//! let flow_manager = OAuthFlowManager::new(config, http_client, Arc::new(SystemClock));
//! let refreshed = flow_manager.refresh_access_token("1//0g-refresh").await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::Clock;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use core_runtime::config::OAuthClientSettings;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{instrument, warn};

/// OAuth client registration.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    /// Absent for public clients
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub token_url: String,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("redirect_uri", &self.redirect_uri)
            .field("token_url", &self.token_url)
            .finish()
    }
}

impl From<&OAuthClientSettings> for OAuthConfig {
    fn from(settings: &OAuthClientSettings) -> Self {
        Self {
            client_id: settings.client_id.clone(),
            client_secret: Some(settings.client_secret.clone()),
            redirect_uri: settings.redirect_uri.clone(),
            token_url: settings.token_url.clone(),
        }
    }
}

/// Result of a successful refresh exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Present only when the provider rotated the refresh token
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for RefreshedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshedToken")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

pub struct OAuthFlowManager {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
}

impl OAuthFlowManager {
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            http_client,
            clock,
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NetworkError`] if the token endpoint could not be reached
    /// - [`AuthError::TokenRefreshFailed`] if it answered with a non-2xx status
    ///   (revoked or invalid refresh token, bad client credentials)
    /// - [`AuthError::Other`] if the response could not be parsed
    #[instrument(skip(self, refresh_token), fields(token_url = %self.config.token_url))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<RefreshedToken> {
        let mut params: Vec<(&str, &str)> = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(ref client_secret) = self.config.client_secret {
            params.push(("client_secret", client_secret.as_str()));
        }

        tracing::debug!("Refreshing access token");

        let encoded_body = serde_urlencoded::to_string(&params)
            .map_err(|e| AuthError::Other(format!("Failed to encode token request: {}", e)))?;

        let request = HttpRequest::new(HttpMethod::Post, self.config.token_url.clone())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(encoded_body));

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        if !response.is_success() {
            let status = response.status;
            let error_body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            warn!(status = status, "Token refresh rejected by token endpoint");

            return Err(AuthError::TokenRefreshFailed(format!(
                "Token endpoint returned {}: {}",
                status, error_body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .map_err(|e| AuthError::Other(format!("Failed to parse token response: {}", e)))?;

        if token_response.access_token.is_empty() {
            return Err(AuthError::TokenRefreshFailed(
                "Token endpoint returned an empty access token".to_string(),
            ));
        }

        tracing::debug!(
            expires_in = token_response.expires_in,
            "Access token refreshed"
        );

        // A negative lifetime means the token is already expired.
        let expires_at = Duration::try_seconds(token_response.expires_in.max(0))
            .and_then(|lifetime| self.clock.now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                AuthError::Other(format!(
                    "invalid expires_in in token response: {}",
                    token_response.expires_in
                ))
            })?;

        Ok(RefreshedToken {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token.filter(|t| !t.is_empty()),
            expires_at,
        })
    }
}

/// Token endpoint response body.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpResponse;
    use bridge_traits::ManualClock;
    use chrono::TimeZone;
    use mockall::mock;

    mock! {
        HttpClient {}

        #[async_trait::async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn config() -> OAuthConfig {
        OAuthConfig {
            client_id: "client-id".to_string(),
            client_secret: Some("client-secret".to_string()),
            redirect_uri: "http://localhost:3000/auth/callback".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn manager(mock: MockHttpClient) -> OAuthFlowManager {
        OAuthFlowManager::new(config(), Arc::new(mock), Arc::new(ManualClock::new(start())))
    }

    #[tokio::test]
    async fn test_refresh_posts_form_to_token_url() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|request| {
                let body = request
                    .body
                    .as_ref()
                    .map(|b| String::from_utf8_lossy(b).to_string())
                    .unwrap_or_default();
                request.method == HttpMethod::Post
                    && request.url == "https://oauth2.googleapis.com/token"
                    && request.header_value("content-type")
                        == Some("application/x-www-form-urlencoded")
                    && body.contains("grant_type=refresh_token")
                    && body.contains("refresh_token=ref%2F1")
                    && body.contains("client_id=client-id")
                    && body.contains("client_secret=client-secret")
            })
            .times(1)
            .returning(|_| {
                Ok(HttpResponse::new(
                    200,
                    r#"{"access_token":"tok2","expires_in":1800,"token_type":"Bearer"}"#,
                ))
            });

        let refreshed = manager(mock).refresh_access_token("ref/1").await.unwrap();

        assert_eq!(refreshed.access_token, "tok2");
        assert_eq!(refreshed.refresh_token, None);
        assert_eq!(refreshed.expires_at, start() + Duration::seconds(1800));
    }

    #[tokio::test]
    async fn test_refresh_defaults_expiry_and_keeps_rotation() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(HttpResponse::new(
                200,
                r#"{"access_token":"tok2","refresh_token":"ref2"}"#,
            ))
        });

        let refreshed = manager(mock).refresh_access_token("ref1").await.unwrap();

        assert_eq!(refreshed.refresh_token.as_deref(), Some("ref2"));
        assert_eq!(refreshed.expires_at, start() + Duration::hours(1));
    }

    #[tokio::test]
    async fn test_refresh_rejected_is_not_retried() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(HttpResponse::new(400, r#"{"error":"invalid_grant"}"#))
        });

        let err = manager(mock).refresh_access_token("revoked").await.unwrap_err();

        match err {
            AuthError::TokenRefreshFailed(message) => {
                assert!(message.contains("400"));
                assert!(message.contains("invalid_grant"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refresh_server_error_is_not_retried() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(503, "unavailable")));

        let result = manager(mock).refresh_access_token("ref1").await;
        assert!(matches!(result, Err(AuthError::TokenRefreshFailed(_))));
    }

    #[tokio::test]
    async fn test_refresh_transport_failure() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::ConnectionFailed("refused".to_string())));

        let result = manager(mock).refresh_access_token("ref1").await;
        assert!(matches!(result, Err(AuthError::NetworkError(msg)) if msg.contains("refused")));
    }

    #[tokio::test]
    async fn test_refresh_malformed_body() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, "<html>")));

        let result = manager(mock).refresh_access_token("ref1").await;
        assert!(matches!(result, Err(AuthError::Other(_))));
    }

    #[tokio::test]
    async fn test_refresh_out_of_range_expires_in_is_error() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(HttpResponse::new(
                200,
                r#"{"access_token":"tok2","expires_in":9223372036854775807}"#,
            ))
        });

        let result = manager(mock).refresh_access_token("ref1").await;
        assert!(matches!(result, Err(AuthError::Other(msg)) if msg.contains("expires_in")));
    }

    #[tokio::test]
    async fn test_refresh_negative_expires_in_is_already_expired() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(HttpResponse::new(
                200,
                r#"{"access_token":"tok2","expires_in":-30}"#,
            ))
        });

        let refreshed = manager(mock).refresh_access_token("ref1").await.unwrap();
        assert_eq!(refreshed.expires_at, start());
    }

    #[test]
    fn test_config_debug_hides_secret() {
        let debug = format!("{:?}", config());
        assert!(debug.contains("client-id"));
        assert!(!debug.contains("client-secret"));
    }

    #[test]
    fn test_token_response_deserialization_minimal() {
        let response: TokenResponse = serde_json::from_str(r#"{"access_token":"token"}"#).unwrap();
        assert_eq!(response.access_token, "token");
        assert_eq!(response.refresh_token, None);
        assert_eq!(response.expires_in, 3600);
    }
}
