use std::sync::Arc;

use http::HeaderMap;
use session_gate::{
    GateConfig, IdentityProvider, SessionClient, SessionConfig, SessionError, provider_from_env,
};

/// Shared state for the gate middleware and the auth routes.
///
/// Cheap to clone. Holds configuration and the provider handle only; nothing
/// about any particular user lives here.
#[derive(Clone)]
pub struct AuthState {
    provider: Arc<dyn IdentityProvider>,
    session: Arc<SessionConfig>,
    gate: Arc<GateConfig>,
}

impl AuthState {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        session: SessionConfig,
        gate: GateConfig,
    ) -> Self {
        Self {
            provider,
            session: Arc::new(session),
            gate: Arc::new(gate),
        }
    }

    /// Build everything from environment variables.
    ///
    /// See [`SessionConfig::from_env`], [`GateConfig::from_env`] and
    /// [`provider_from_env`] for the variables read.
    pub fn from_env() -> Result<Self, SessionError> {
        let provider = provider_from_env()?;
        let session = SessionConfig::from_env()?;
        let gate = GateConfig::from_env()?;
        tracing::info!(
            cookie = session.cookie_name(),
            login = gate.login_path(),
            protected_root = gate.protected_root(),
            "Auth state initialized"
        );
        Ok(Self::new(provider, session, gate))
    }

    pub fn gate(&self) -> &GateConfig {
        &self.gate
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session
    }

    /// Request-scoped client over the cookies in `headers`
    pub(crate) fn client(&self, headers: &HeaderMap) -> Result<SessionClient, SessionError> {
        SessionClient::from_request_headers(self.provider.clone(), self.session.clone(), headers)
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("session", &self.session)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
