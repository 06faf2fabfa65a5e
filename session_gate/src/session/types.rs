use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::session::errors::SessionError;

/// Authenticated identity as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Stable provider-side identifier
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Free-form metadata supplied by the upstream OAuth provider
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
    /// Free-form metadata supplied by the application
    #[serde(default)]
    pub app_metadata: Map<String, Value>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            user_metadata: Map::new(),
            app_metadata: Map::new(),
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Credential pair issued by the identity provider.
///
/// This is the representation carried inside the session cookie(s). It is only
/// ever treated as authenticated when both credential parts are present, see
/// [`Session::is_complete`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl Session {
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }

    pub fn is_expired(&self) -> bool {
        self.expires_within(Duration::zero())
    }

    /// True if the access token expires before `now + margin`
    pub fn expires_within(&self, margin: Duration) -> bool {
        Utc::now()
            .checked_add_signed(margin)
            .is_none_or(|limit| self.expires_at <= limit)
    }
}

/// Result of any session check.
///
/// A `TransientError` is never an authenticated state; callers that need a
/// yes/no answer must use [`AuthenticationOutcome::is_authenticated`].
#[derive(Debug, Clone)]
pub enum AuthenticationOutcome {
    Authenticated(User),
    Unauthenticated,
    TransientError(SessionError),
}

impl AuthenticationOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}
