use serde::Deserialize;

use crate::provider::ProviderError;
use crate::session::{CookieEntry, SessionClient};

use super::config::GateConfig;

/// Query parameters the identity provider appends to the callback URL
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl CallbackParams {
    pub fn code(&self) -> Option<&str> {
        non_empty(&self.code)
    }

    /// Human readable provider error, `error_description` preferred
    pub fn provider_error(&self) -> Option<&str> {
        let error = non_empty(&self.error)?;
        Some(non_empty(&self.error_description).unwrap_or(error))
    }
}

/// Why a login attempt was sent back to the login page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginErrorReason {
    SessionExchangeFailed,
    NoSession,
    UserNotFound,
    NoCode,
    /// The callback request itself could not be processed
    CallbackError,
    /// Error text reported by the identity provider
    Provider(String),
}

impl LoginErrorReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SessionExchangeFailed => "session_exchange_failed",
            Self::NoSession => "no_session",
            Self::UserNotFound => "user_not_found",
            Self::NoCode => "no_code",
            Self::CallbackError => "callback_error",
            Self::Provider(message) => message,
        }
    }
}

/// `login_path?error=<reason>` with the reason URL-encoded
pub fn login_redirect_url(login_path: &str, reason: &LoginErrorReason) -> String {
    format!(
        "{login_path}?error={}",
        urlencoding::encode(reason.as_str())
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    RedirectProtected,
    RedirectLoginError(LoginErrorReason),
}

impl CallbackOutcome {
    /// Where the browser is sent
    pub fn location(&self, config: &GateConfig) -> String {
        match self {
            Self::RedirectProtected => config.protected_root.clone(),
            Self::RedirectLoginError(reason) => login_redirect_url(&config.login_path, reason),
        }
    }
}

/// Terminal state of the callback together with the cookies the redirect
/// response must carry
#[derive(Debug)]
pub struct CallbackResult {
    pub outcome: CallbackOutcome,
    pub cookies: Vec<CookieEntry>,
}

/// Complete the OAuth redirect: one request, one transition, one redirect.
///
/// Never retries. Every failure ends in [`CallbackOutcome::RedirectLoginError`].
#[tracing::instrument(skip_all)]
pub async fn handle_callback(mut client: SessionClient, params: &CallbackParams) -> CallbackResult {
    let outcome = callback_transition(&mut client, params).await;
    CallbackResult {
        outcome,
        cookies: client.into_cookie_writes(),
    }
}

async fn callback_transition(client: &mut SessionClient, params: &CallbackParams) -> CallbackOutcome {
    if let Some(message) = params.provider_error() {
        tracing::warn!(error = ?params.error, description = %message, "OAuth error from provider");
        return CallbackOutcome::RedirectLoginError(LoginErrorReason::Provider(message.to_string()));
    }

    let Some(code) = params.code() else {
        tracing::warn!("Callback without code or error");
        return CallbackOutcome::RedirectLoginError(LoginErrorReason::NoCode);
    };

    match client.exchange_code_for_session(code).await {
        Ok(_) => {}
        Err(ProviderError::NoSessionReturned) => {
            tracing::error!("Code exchange returned no session");
            return CallbackOutcome::RedirectLoginError(LoginErrorReason::NoSession);
        }
        Err(e) => {
            tracing::error!(error = %e, "Session exchange failed");
            return CallbackOutcome::RedirectLoginError(LoginErrorReason::SessionExchangeFailed);
        }
    }

    match client.get_current_user().await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "Authentication successful");
            CallbackOutcome::RedirectProtected
        }
        Err(e) => {
            tracing::error!(error = %e, "Exchanged session has no resolvable user");
            client.clear_session();
            CallbackOutcome::RedirectLoginError(LoginErrorReason::UserNotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;
    use crate::session::{CookieStore, SessionConfig, User};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn params(code: Option<&str>, error: Option<&str>, description: Option<&str>) -> CallbackParams {
        CallbackParams {
            code: code.map(str::to_string),
            error: error.map(str::to_string),
            error_description: description.map(str::to_string),
        }
    }

    fn client(provider: &Arc<InMemoryProvider>) -> SessionClient {
        SessionClient::new(
            provider.clone(),
            Arc::new(SessionConfig::default()),
            CookieStore::default(),
        )
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(LoginErrorReason::SessionExchangeFailed.as_str(), "session_exchange_failed");
        assert_eq!(LoginErrorReason::NoSession.as_str(), "no_session");
        assert_eq!(LoginErrorReason::UserNotFound.as_str(), "user_not_found");
        assert_eq!(LoginErrorReason::NoCode.as_str(), "no_code");
        assert_eq!(LoginErrorReason::CallbackError.as_str(), "callback_error");
        assert_eq!(
            LoginErrorReason::Provider("access_denied".into()).as_str(),
            "access_denied"
        );
    }

    #[test]
    fn test_login_redirect_url_encodes_reason() {
        let url = login_redirect_url(
            "/auth/login",
            &LoginErrorReason::Provider("User cancelled".into()),
        );
        assert_eq!(url, "/auth/login?error=User%20cancelled");

        let url = login_redirect_url(
            "/auth/login",
            &LoginErrorReason::Provider("a&b=c#d".into()),
        );
        assert_eq!(url, "/auth/login?error=a%26b%3Dc%23d");
    }

    #[test]
    fn test_provider_error_prefers_description_and_ignores_empty() {
        let p = params(None, Some("access_denied"), Some("User cancelled"));
        assert_eq!(p.provider_error(), Some("User cancelled"));

        let p = params(None, Some("access_denied"), Some(""));
        assert_eq!(p.provider_error(), Some("access_denied"));

        let p = params(Some("abc"), Some(""), Some("ignored"));
        assert_eq!(p.provider_error(), None);
        assert_eq!(p.code(), Some("abc"));

        assert_eq!(params(Some(""), None, None).code(), None);
    }

    #[tokio::test]
    async fn test_valid_code_redirects_to_protected_root_with_cookie() {
        let provider = Arc::new(InMemoryProvider::new());
        let code = provider.issue_code(User::new("user-1")).expect("code");

        let result = handle_callback(client(&provider), &params(Some(&code), None, None)).await;
        assert_eq!(result.outcome, CallbackOutcome::RedirectProtected);
        assert_eq!(result.outcome.location(&GateConfig::default()), "/dashboard");
        assert!(
            result
                .cookies
                .iter()
                .any(|c| c.name == "__Host-AuthToken" && !c.is_removal())
        );
    }

    #[tokio::test]
    async fn test_provider_error_wins_over_code() {
        let provider = Arc::new(InMemoryProvider::new());
        let code = provider.issue_code(User::new("user-1")).expect("code");

        let result = handle_callback(
            client(&provider),
            &params(Some(&code), Some("access_denied"), Some("User cancelled")),
        )
        .await;
        assert_eq!(
            result.outcome.location(&GateConfig::default()),
            "/auth/login?error=User%20cancelled"
        );
        assert!(result.cookies.is_empty());

        // the code was never redeemed
        let retry = handle_callback(client(&provider), &params(Some(&code), None, None)).await;
        assert_eq!(retry.outcome, CallbackOutcome::RedirectProtected);
    }

    #[tokio::test]
    async fn test_missing_code() {
        let provider = Arc::new(InMemoryProvider::new());
        let result = handle_callback(client(&provider), &CallbackParams::default()).await;
        assert_eq!(
            result.outcome.location(&GateConfig::default()),
            "/auth/login?error=no_code"
        );
    }

    #[tokio::test]
    async fn test_reused_code_is_exchange_failure() {
        let provider = Arc::new(InMemoryProvider::new());
        let code = provider.issue_code(User::new("user-1")).expect("code");

        handle_callback(client(&provider), &params(Some(&code), None, None)).await;
        let result = handle_callback(client(&provider), &params(Some(&code), None, None)).await;
        assert_eq!(
            result.outcome,
            CallbackOutcome::RedirectLoginError(LoginErrorReason::SessionExchangeFailed)
        );
        assert!(result.cookies.is_empty());
    }

    #[tokio::test]
    async fn test_exchange_without_session() {
        let provider = Arc::new(InMemoryProvider::new());
        let code = provider.issue_empty_code().expect("code");

        let result = handle_callback(client(&provider), &params(Some(&code), None, None)).await;
        assert_eq!(
            result.outcome,
            CallbackOutcome::RedirectLoginError(LoginErrorReason::NoSession)
        );
    }

    #[tokio::test]
    async fn test_unresolvable_user_clears_fresh_session() {
        let provider = Arc::new(InMemoryProvider::new());
        let code = provider.issue_code(User::new("user-1")).expect("code");
        // deleted after the code was issued, so the exchange still yields a session
        provider.delete_user("user-1").expect("deleted");

        let result = handle_callback(client(&provider), &params(Some(&code), None, None)).await;
        assert_eq!(
            result.outcome,
            CallbackOutcome::RedirectLoginError(LoginErrorReason::UserNotFound)
        );
        let session_cookie = result
            .cookies
            .iter()
            .find(|c| c.name == "__Host-AuthToken")
            .expect("session cookie written");
        assert!(session_cookie.is_removal());
    }

    #[tokio::test]
    async fn test_provider_outage_during_exchange() {
        let provider = Arc::new(InMemoryProvider::new());
        let code = provider.issue_code(User::new("user-1")).expect("code");
        provider.set_unavailable(true);

        let result = handle_callback(client(&provider), &params(Some(&code), None, None)).await;
        assert_eq!(
            result.outcome,
            CallbackOutcome::RedirectLoginError(LoginErrorReason::SessionExchangeFailed)
        );
    }

    proptest! {
        /// Whatever the provider reports, the redirect stays on the login page
        #[test]
        fn test_login_redirect_never_leaves_login_path(message in "\\PC{0,64}") {
            let url = login_redirect_url("/auth/login", &LoginErrorReason::Provider(message.clone()));
            let query = url.strip_prefix("/auth/login?error=");
            prop_assert!(query.is_some());
            let query = query.unwrap_or_default();
            prop_assert!(!query.contains('&'));
            prop_assert!(!query.contains('#'));
            let decoded = urlencoding::decode(query).map(|d| d.into_owned());
            prop_assert_eq!(decoded.ok(), Some(message));
        }
    }
}
