use thiserror::Error;

use crate::provider::ProviderError;
use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    /// No complete session is present in the request cookies
    #[error("No session")]
    MissingSession,

    /// The session exists but the provider could not resolve a user for it
    #[error("User could not be resolved: {0}")]
    UserUnresolvable(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Cookie error: {0}")]
    Cookie(String),

    /// A cookie could not be written onto the outbound response
    #[error("Cookie propagation error: {0}")]
    CookiePropagation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from utils operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}

impl SessionError {
    /// True when the failure comes from an unreachable provider rather than bad credentials
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Provider(e) if e.is_transient())
    }
}
