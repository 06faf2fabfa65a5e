use std::sync::Arc;

use http::header::HeaderMap;

use crate::provider::{IdentityProvider, ProviderError};
use crate::session::config::SessionConfig;
use crate::session::errors::SessionError;
use crate::session::types::{AuthenticationOutcome, Session, User};
use crate::utils::{gen_random_string, pkce_challenge};

use super::cookie::{CookieEntry, CookieStore};
use super::session_cookie::{
    chunk_entries, decode_session, encode_session, read_chunked, removal_entries,
};

/// Cookies rotated by [`SessionClient::refresh_if_needed`] together with the
/// resulting authentication state
#[derive(Debug)]
pub struct RefreshOutcome {
    pub cookies: Vec<CookieEntry>,
    pub outcome: AuthenticationOutcome,
}

/// Request-scoped handle to the identity provider.
///
/// Holds no state beyond the request's own cookies. Every session change is
/// staged as a cookie write which the caller must put on the response.
pub struct SessionClient {
    provider: Arc<dyn IdentityProvider>,
    config: Arc<SessionConfig>,
    cookies: CookieStore,
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("cookie_name", &self.config.cookie_name)
            .field("cookies", &self.cookies.read_all().len())
            .finish()
    }
}

impl SessionClient {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        config: Arc<SessionConfig>,
        cookies: CookieStore,
    ) -> Self {
        Self {
            provider,
            config,
            cookies,
        }
    }

    pub fn from_request_headers(
        provider: Arc<dyn IdentityProvider>,
        config: Arc<SessionConfig>,
        headers: &HeaderMap,
    ) -> Result<Self, SessionError> {
        let cookies = CookieStore::from_headers(headers)?;
        Ok(Self::new(provider, config, cookies))
    }

    pub fn cookies(&self) -> &CookieStore {
        &self.cookies
    }

    /// Drain the cookie writes staged so far
    pub fn take_cookie_writes(&mut self) -> Vec<CookieEntry> {
        self.cookies.take_pending()
    }

    pub fn into_cookie_writes(mut self) -> Vec<CookieEntry> {
        self.cookies.take_pending()
    }

    fn stored_session(&self) -> Result<Option<Session>, SessionError> {
        read_chunked(&self.cookies, &self.config.cookie_name)
            .map(|raw| decode_session(&raw))
            .transpose()
    }

    fn store_session(&mut self, session: &Session) -> Result<(), SessionError> {
        let value = encode_session(session)?;
        let entries = chunk_entries(
            &self.cookies,
            &self.config.cookie_name,
            &value,
            &self.config.cookie_options,
        );
        self.cookies.write_all(entries);
        Ok(())
    }

    /// Expire every cookie belonging to the session, including a leftover
    /// PKCE verifier
    pub fn clear_session(&mut self) {
        let mut entries = removal_entries(
            &self.cookies,
            &self.config.cookie_name,
            &self.config.cookie_options,
        );
        let verifier_name = self.config.code_verifier_cookie_name();
        if self.cookies.get(&verifier_name).is_some() {
            entries.push(CookieEntry::removal(
                verifier_name,
                &self.config.cookie_options,
            ));
        }
        self.cookies.write_all(entries);
    }

    /// Session as carried by the cookies, without asking the provider.
    ///
    /// Only complete sessions are returned. Not suitable for access decisions.
    pub fn get_session(&self) -> Option<Session> {
        match self.stored_session() {
            Ok(session) => session.filter(Session::is_complete),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring undecodable session cookie");
                None
            }
        }
    }

    /// Exchange an authorization code for a session and stage its cookies.
    ///
    /// The PKCE verifier cookie, if any, is sent along and then expired.
    #[tracing::instrument(skip_all)]
    pub async fn exchange_code_for_session(&mut self, code: &str) -> Result<Session, ProviderError> {
        let verifier_name = self.config.code_verifier_cookie_name();
        let verifier = self.cookies.get(&verifier_name).map(str::to_string);
        tracing::debug!(has_verifier = verifier.is_some(), "Exchanging authorization code");

        let result = self.provider.exchange_code(code, verifier.as_deref()).await;

        if verifier.is_some() {
            self.cookies.write_all([CookieEntry::removal(
                verifier_name,
                &self.config.cookie_options,
            )]);
        }

        let session = result?
            .filter(Session::is_complete)
            .ok_or(ProviderError::NoSessionReturned)?;

        self.store_session(&session)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        tracing::debug!(user_id = %session.user.id, "Session established");
        Ok(session)
    }

    /// Look up the user of the current session at the provider.
    ///
    /// Always a live call, so a session revoked provider-side is noticed.
    #[tracing::instrument(skip_all)]
    pub async fn get_current_user(&self) -> Result<User, SessionError> {
        let session = self.get_session().ok_or(SessionError::MissingSession)?;
        let user = self.provider.get_user(&session.access_token).await?;
        if user.id.is_empty() {
            return Err(SessionError::UserUnresolvable(
                "Provider returned a user without an identifier".to_string(),
            ));
        }
        Ok(user)
    }

    /// Refresh the session if it is close to expiry and classify the request.
    ///
    /// Rotated credentials come back as cookie writes; a session the provider
    /// refuses is cleared. A provider outage leaves the cookies untouched.
    #[tracing::instrument(skip_all)]
    pub async fn refresh_if_needed(&mut self) -> RefreshOutcome {
        let outcome = self.refresh_and_classify().await;
        RefreshOutcome {
            cookies: self.cookies.take_pending(),
            outcome,
        }
    }

    async fn refresh_and_classify(&mut self) -> AuthenticationOutcome {
        let session = match self.stored_session() {
            Ok(Some(session)) if session.is_complete() => session,
            Ok(Some(_)) => {
                tracing::debug!("Clearing incomplete session cookie");
                self.clear_session();
                return AuthenticationOutcome::Unauthenticated;
            }
            Ok(None) => return AuthenticationOutcome::Unauthenticated,
            Err(e) => {
                tracing::debug!(error = %e, "Clearing undecodable session cookie");
                self.clear_session();
                return AuthenticationOutcome::Unauthenticated;
            }
        };

        let session = if session.expires_within(self.config.refresh_margin) {
            match self.provider.refresh_session(&session.refresh_token).await {
                Ok(Some(rotated)) if rotated.is_complete() => {
                    if let Err(e) = self.store_session(&rotated) {
                        tracing::error!(error = %e, "Failed to stage rotated session");
                        return AuthenticationOutcome::TransientError(e);
                    }
                    tracing::debug!(user_id = %rotated.user.id, "Session refreshed");
                    rotated
                }
                Ok(_) => {
                    tracing::debug!("Refresh returned no session");
                    self.clear_session();
                    return AuthenticationOutcome::Unauthenticated;
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(error = %e, "Session refresh failed");
                    return AuthenticationOutcome::TransientError(e.into());
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Refresh token rejected");
                    self.clear_session();
                    return AuthenticationOutcome::Unauthenticated;
                }
            }
        } else {
            session
        };

        match self.provider.get_user(&session.access_token).await {
            Ok(user) if !user.id.is_empty() => AuthenticationOutcome::Authenticated(user),
            Ok(_) => AuthenticationOutcome::Unauthenticated,
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, "User lookup failed");
                AuthenticationOutcome::TransientError(e.into())
            }
            Err(e) => {
                tracing::debug!(error = %e, "Access token rejected");
                self.clear_session();
                AuthenticationOutcome::Unauthenticated
            }
        }
    }

    /// Start an OAuth flow with `provider_name`.
    ///
    /// Stages the PKCE verifier cookie and returns the URL to send the browser to.
    #[tracing::instrument(skip(self))]
    pub fn sign_in_with_oauth(
        &mut self,
        provider_name: &str,
        redirect_to: &str,
    ) -> Result<String, SessionError> {
        let verifier = gen_random_string(32)?;
        let url =
            self.provider
                .authorize_url(provider_name, redirect_to, &pkce_challenge(&verifier))?;

        self.cookies.write_all([CookieEntry::new(
            self.config.code_verifier_cookie_name(),
            verifier,
            self.config.cookie_options.clone(),
        )]);
        Ok(url)
    }

    /// Revoke the session at the provider and expire its cookies.
    ///
    /// Cookies are cleared even when the provider cannot be reached.
    #[tracing::instrument(skip_all)]
    pub async fn sign_out(&mut self) {
        if let Some(session) = self.get_session() {
            match self.provider.sign_out(&session.access_token).await {
                Ok(()) => tracing::info!(user_id = %session.user.id, "Signed out"),
                Err(e) => tracing::warn!(error = %e, "Provider sign-out failed"),
            }
        }
        self.clear_session();
    }
}
