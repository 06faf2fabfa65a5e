use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider refused the credential (expired, reused or malformed code, revoked token)
    #[error("Provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The provider reported success but did not return a session payload
    #[error("Provider returned no session")]
    NoSessionReturned,

    /// The provider could not be reached or failed on its side
    #[error("Provider unavailable: {0}")]
    Transient(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Provider configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    pub(crate) fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// True when retrying later could succeed without user action
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
