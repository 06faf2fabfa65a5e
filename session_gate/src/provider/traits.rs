use async_trait::async_trait;

use crate::session::{Session, User};

use super::errors::ProviderError;

/// The external identity provider.
///
/// Implementations classify failures: a refused credential is
/// [`ProviderError::Rejected`], an unreachable or failing provider is
/// [`ProviderError::Transient`]. A successful call that carries no session
/// payload returns `Ok(None)` rather than an error.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Exchange a one-time authorization code (plus the PKCE verifier that
    /// started the flow, if any) for a session
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Option<Session>, ProviderError>;

    /// Resolve the user an access token belongs to
    async fn get_user(&self, access_token: &str) -> Result<User, ProviderError>;

    /// Trade a refresh token for a new session. Refresh tokens may be single use.
    async fn refresh_session(&self, refresh_token: &str)
    -> Result<Option<Session>, ProviderError>;

    /// Revoke the session an access token belongs to
    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError>;

    /// URL that starts the OAuth flow with `provider` (e.g. `google`) and
    /// returns to `redirect_to` with a code
    fn authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String, ProviderError>;
}
