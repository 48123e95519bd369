use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable external identity of a user, as extracted from their verified
/// bearer credential by the host.
///
/// # Examples
///
/// ```
/// use core_auth::UserId;
///
/// let user = UserId::from("google-oauth2|1234");
/// assert_eq!(user.as_str(), "google-oauth2|1234");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Delegated credentials supplied when a session is initialized.
///
/// Serialized with the camelCase field names hosts receive from their
/// sign-in flow (`accessToken`, `refreshToken`, `expiryDate` in Unix
/// milliseconds).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry_date: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expiry_date: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry_date = Some(expiry);
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expiry_date", &self.expiry_date)
            .finish()
    }
}

/// One user's delegated access to the document provider.
///
/// Owned by the session registry; callers receive clones.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSession {
    pub user_id: UserId,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl CredentialSession {
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// True when no expiry is recorded or the token expires in less than
    /// `buffer` from `now`. Already-expired tokens count as expiring.
    pub fn is_expiring(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        match self.expiry {
            None => true,
            Some(expiry) => expiry - now < buffer,
        }
    }
}

impl fmt::Debug for CredentialSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSession")
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expiry", &self.expiry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(expiry: Option<DateTime<Utc>>) -> CredentialSession {
        CredentialSession {
            user_id: UserId::from("u1"),
            access_token: "tok1".to_string(),
            refresh_token: Some("ref1".to_string()),
            expiry,
        }
    }

    #[test]
    fn test_credentials_deserialize_from_camel_case() {
        let credentials: Credentials = serde_json::from_str(
            r#"{"accessToken":"tok1","refreshToken":"ref1","expiryDate":1700000000000}"#,
        )
        .unwrap();

        assert_eq!(credentials.access_token, "tok1");
        assert_eq!(credentials.refresh_token.as_deref(), Some("ref1"));
        assert_eq!(
            credentials.expiry_date,
            Some(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap())
        );
    }

    #[test]
    fn test_credentials_missing_access_token_defaults_empty() {
        let credentials: Credentials = serde_json::from_str(r#"{"refreshToken":"r"}"#).unwrap();
        assert!(credentials.access_token.is_empty());
        assert!(credentials.expiry_date.is_none());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let credentials = Credentials::new("secret_access").with_refresh_token("secret_refresh");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret_access"));
        assert!(!debug.contains("secret_refresh"));

        let debug = format!("{:?}", session(None));
        assert!(debug.contains("u1"));
        assert!(!debug.contains("tok1"));
        assert!(!debug.contains("ref1"));
    }

    #[test]
    fn test_is_expiring_window() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let buffer = Duration::minutes(5);

        assert!(session(None).is_expiring(now, buffer));
        assert!(session(Some(now - Duration::minutes(1))).is_expiring(now, buffer));
        assert!(session(Some(now + Duration::minutes(4))).is_expiring(now, buffer));
        assert!(!session(Some(now + Duration::minutes(5))).is_expiring(now, buffer));
        assert!(!session(Some(now + Duration::hours(1))).is_expiring(now, buffer));
    }

    #[test]
    fn test_user_id_display_and_serde() {
        let user = UserId::new("u-42");
        assert_eq!(user.to_string(), "u-42");
        assert_eq!(serde_json::to_string(&user).unwrap(), r#""u-42""#);
    }
}
