use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::session::{Session, User};

/// Token endpoint response body.
///
/// Every field is optional: a provider may answer 2xx with an empty or partial
/// body, which is reported as "no session" rather than as a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub(crate) access_token: Option<String>,
    #[serde(default)]
    pub(crate) refresh_token: Option<String>,
    #[serde(default)]
    pub(crate) token_type: Option<String>,
    #[serde(default)]
    pub(crate) expires_in: Option<i64>,
    /// Absolute expiry in seconds since the epoch, preferred over `expires_in`
    #[serde(default)]
    pub(crate) expires_at: Option<i64>,
    #[serde(default)]
    pub(crate) user: Option<User>,
}

/// Error body in either OAuth (`error_description`) or GoTrue (`msg`) form
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub(crate) error: Option<String>,
    #[serde(default)]
    pub(crate) error_description: Option<String>,
    #[serde(default)]
    pub(crate) msg: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<String>,
}

impl ErrorResponse {
    pub(crate) fn describe(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .filter(|m| !m.is_empty())
    }
}

impl TokenResponse {
    /// Build a session when both tokens and a user are present
    pub(crate) fn into_session(self) -> Option<Session> {
        let access_token = self.access_token.filter(|t| !t.is_empty())?;
        let refresh_token = self.refresh_token.filter(|t| !t.is_empty())?;
        let user = self.user?;

        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .or_else(|| {
                self.expires_in
                    .and_then(Duration::try_seconds)
                    .and_then(|d| Utc::now().checked_add_signed(d))
            })
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        Some(Session {
            access_token,
            refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "bearer".to_string()),
            expires_at,
            user,
        })
    }
}
