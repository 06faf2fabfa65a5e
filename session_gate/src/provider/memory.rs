use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use url::Url;

use crate::session::{Session, User};
use crate::utils::{gen_random_string, pkce_challenge};

use super::errors::ProviderError;
use super::traits::IdentityProvider;

const DEFAULT_SESSION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Clone)]
enum PendingCode {
    Session {
        user_id: String,
        code_challenge: Option<String>,
    },
    Empty,
}

#[derive(Debug, Clone)]
struct IssuedToken {
    user_id: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct ProviderState {
    users: HashMap<String, User>,
    codes: HashMap<String, PendingCode>,
    access_tokens: HashMap<String, IssuedToken>,
    /// refresh token -> user id
    refresh_tokens: HashMap<String, String>,
}

/// Identity provider held entirely in process memory.
///
/// Authorization codes and refresh tokens are single use, and every refresh
/// rotates both tokens. An outage can be simulated with
/// [`InMemoryProvider::set_unavailable`].
///
/// There is no authorization page behind it: OAuth sign-in fails with a
/// configuration error unless [`InMemoryProvider::with_authorize_url`] names one.
#[derive(Debug)]
pub struct InMemoryProvider {
    state: Mutex<ProviderState>,
    unavailable: AtomicBool,
    session_lifetime: Duration,
    authorize_url: Option<String>,
    user_lookups: AtomicUsize,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProvider {
    pub fn new() -> Self {
        tracing::info!("Creating in-memory identity provider");
        Self {
            state: Mutex::new(ProviderState::default()),
            unavailable: AtomicBool::new(false),
            session_lifetime: Duration::seconds(DEFAULT_SESSION_LIFETIME_SECS),
            authorize_url: None,
            user_lookups: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_session_lifetime(mut self, lifetime: Duration) -> Self {
        self.session_lifetime = lifetime;
        self
    }

    /// Page that sign-in redirects to, e.g. a local stub of the provider
    #[must_use]
    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = Some(url.into());
        self
    }

    fn state(&self) -> Result<MutexGuard<'_, ProviderState>, ProviderError> {
        self.state
            .lock()
            .map_err(|_| ProviderError::Transient("Provider state lock poisoned".to_string()))
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProviderError::Transient("Provider unavailable".to_string()));
        }
        Ok(())
    }

    /// Make every call fail as if the provider were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `get_user` calls served so far
    pub fn user_lookups(&self) -> usize {
        self.user_lookups.load(Ordering::SeqCst)
    }

    /// Forget a user; tokens issued to it stop resolving
    pub fn delete_user(&self, user_id: &str) -> Result<(), ProviderError> {
        self.state()?.users.remove(user_id);
        Ok(())
    }

    /// Issue a one-time authorization code for `user`
    pub fn issue_code(&self, user: User) -> Result<String, ProviderError> {
        self.issue_code_inner(user, None)
    }

    /// Issue a code bound to a PKCE S256 challenge
    pub fn issue_code_with_challenge(
        &self,
        user: User,
        code_challenge: &str,
    ) -> Result<String, ProviderError> {
        self.issue_code_inner(user, Some(code_challenge.to_string()))
    }

    /// Issue a code whose exchange succeeds without returning a session
    pub fn issue_empty_code(&self) -> Result<String, ProviderError> {
        let code = Self::random_token()?;
        self.state()?.codes.insert(code.clone(), PendingCode::Empty);
        Ok(code)
    }

    fn issue_code_inner(
        &self,
        user: User,
        code_challenge: Option<String>,
    ) -> Result<String, ProviderError> {
        let code = Self::random_token()?;
        let mut state = self.state()?;
        let user_id = user.id.clone();
        state.users.insert(user_id.clone(), user);
        state.codes.insert(
            code.clone(),
            PendingCode::Session {
                user_id,
                code_challenge,
            },
        );
        Ok(code)
    }

    /// Issue a session directly, bypassing the code flow
    pub fn issue_session(&self, user: User) -> Result<Session, ProviderError> {
        self.issue_session_expiring_in(user, self.session_lifetime)
    }

    pub fn issue_session_expiring_in(
        &self,
        user: User,
        lifetime: Duration,
    ) -> Result<Session, ProviderError> {
        let mut state = self.state()?;
        state.users.insert(user.id.clone(), user.clone());
        Self::mint(&mut state, user, lifetime)
    }

    fn random_token() -> Result<String, ProviderError> {
        gen_random_string(32).map_err(|e| ProviderError::Transient(e.to_string()))
    }

    fn mint(
        state: &mut ProviderState,
        user: User,
        lifetime: Duration,
    ) -> Result<Session, ProviderError> {
        let access_token = Self::random_token()?;
        let refresh_token = Self::random_token()?;
        let expires_at = Utc::now() + lifetime;

        state.access_tokens.insert(
            access_token.clone(),
            IssuedToken {
                user_id: user.id.clone(),
                refresh_token: refresh_token.clone(),
                expires_at,
            },
        );
        state
            .refresh_tokens
            .insert(refresh_token.clone(), user.id.clone());

        Ok(Session {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_at,
            user,
        })
    }
}

#[async_trait]
impl IdentityProvider for InMemoryProvider {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Option<Session>, ProviderError> {
        self.check_available()?;
        let mut state = self.state()?;

        let pending = state
            .codes
            .remove(code)
            .ok_or_else(|| ProviderError::rejected(400, "Invalid or reused authorization code"))?;

        let (user_id, code_challenge) = match pending {
            PendingCode::Empty => return Ok(None),
            PendingCode::Session {
                user_id,
                code_challenge,
            } => (user_id, code_challenge),
        };

        if let Some(challenge) = code_challenge {
            let verified = code_verifier.is_some_and(|v| pkce_challenge(v) == challenge);
            if !verified {
                return Err(ProviderError::rejected(400, "Code verifier does not match"));
            }
        }

        let user = state
            .users
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| User::new(user_id));
        Self::mint(&mut state, user, self.session_lifetime).map(Some)
    }

    async fn get_user(&self, access_token: &str) -> Result<User, ProviderError> {
        self.check_available()?;
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.state()?;

        let issued = state
            .access_tokens
            .get(access_token)
            .ok_or_else(|| ProviderError::rejected(401, "Invalid JWT"))?;
        if issued.expires_at <= Utc::now() {
            return Err(ProviderError::rejected(401, "JWT expired"));
        }
        state
            .users
            .get(&issued.user_id)
            .cloned()
            .ok_or_else(|| ProviderError::rejected(404, "User not found"))
    }

    async fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> Result<Option<Session>, ProviderError> {
        self.check_available()?;
        let mut state = self.state()?;

        let user_id = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| ProviderError::rejected(400, "Invalid Refresh Token"))?;
        state
            .access_tokens
            .retain(|_, issued| issued.refresh_token != refresh_token);

        let user = state
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| ProviderError::rejected(404, "User not found"))?;
        Self::mint(&mut state, user, self.session_lifetime).map(Some)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        self.check_available()?;
        let mut state = self.state()?;

        let issued = state
            .access_tokens
            .remove(access_token)
            .ok_or_else(|| ProviderError::rejected(401, "Invalid JWT"))?;
        state.refresh_tokens.remove(&issued.refresh_token);
        Ok(())
    }

    fn authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String, ProviderError> {
        let base = self.authorize_url.as_deref().ok_or_else(|| {
            tracing::warn!("OAuth sign-in attempted against the in-memory identity provider");
            ProviderError::Config(
                "In-memory identity provider has no authorization page; set AUTH_PROVIDER_URL"
                    .to_string(),
            )
        })?;
        let mut url = Url::parse(base).map_err(|e| ProviderError::Config(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "s256");
        Ok(url.to_string())
    }
}
