use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::session::{Session, User};

use super::config::ProviderConfig;
use super::errors::ProviderError;
use super::traits::IdentityProvider;
use super::types::{ErrorResponse, TokenResponse};

const TOKEN_PATH: &str = "auth/v1/token";
const USER_PATH: &str = "auth/v1/user";
const LOGOUT_PATH: &str = "auth/v1/logout";
const AUTHORIZE_PATH: &str = "auth/v1/authorize";

/// [`IdentityProvider`] speaking the GoTrue REST dialect over HTTP
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl HttpIdentityProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|e| ProviderError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn with_api_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header("apikey", key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let response = self
            .with_api_key(request)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(ErrorResponse::describe)
            .unwrap_or_else(|| status.to_string());

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(status = status.as_u16(), %message, "Identity provider unavailable");
            Err(ProviderError::Transient(format!("{status}: {message}")))
        } else {
            tracing::debug!(status = status.as_u16(), %message, "Identity provider rejected request");
            Err(ProviderError::rejected(status.as_u16(), message))
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to deserialize body: {e}")))
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Option<Session>, ProviderError> {
        let mut url = self.config.endpoint(TOKEN_PATH)?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self.send(self.client.post(url).json(&body)).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to deserialize token: {e}")))?;
        Ok(token.into_session())
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    #[tracing::instrument(skip_all)]
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Option<Session>, ProviderError> {
        self.token_grant(
            "pkce",
            json!({
                "auth_code": code,
                "code_verifier": code_verifier.unwrap_or_default(),
            }),
        )
        .await
    }

    #[tracing::instrument(skip_all)]
    async fn get_user(&self, access_token: &str) -> Result<User, ProviderError> {
        let url = self.config.endpoint(USER_PATH)?;
        let response = self
            .send(self.client.get(url).bearer_auth(access_token))
            .await?;
        Self::parse(response).await
    }

    #[tracing::instrument(skip_all)]
    async fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> Result<Option<Session>, ProviderError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    #[tracing::instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        let url = self.config.endpoint(LOGOUT_PATH)?;
        self.send(self.client.post(url).bearer_auth(access_token))
            .await?;
        Ok(())
    }

    fn authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String, ProviderError> {
        let mut url = self.config.endpoint(AUTHORIZE_PATH)?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "s256");
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> HttpIdentityProvider {
        let config = ProviderConfig::new("https://project.example.co")
            .expect("valid url")
            .with_api_key("anon");
        HttpIdentityProvider::new(config).expect("client")
    }

    #[test]
    fn test_authorize_url_carries_pkce_parameters() {
        let url = provider()
            .authorize_url("google", "https://app.example.com/auth/callback", "challenge")
            .expect("valid url");
        let parsed = url::Url::parse(&url).expect("absolute url");

        assert_eq!(parsed.path(), "/auth/v1/authorize");
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("provider".into(), "google".into())));
        assert!(pairs.contains(&(
            "redirect_to".into(),
            "https://app.example.com/auth/callback".into()
        )));
        assert!(pairs.contains(&("code_challenge".into(), "challenge".into())));
        assert!(pairs.contains(&("code_challenge_method".into(), "s256".into())));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_transient() {
        // Port 9 (discard) on localhost is not expected to accept HTTP
        let config = ProviderConfig::new("http://127.0.0.1:9")
            .expect("valid url")
            .with_timeout(std::time::Duration::from_secs(2));
        let provider = HttpIdentityProvider::new(config).expect("client");

        let result = provider.get_user("token").await;
        assert!(matches!(result, Err(ProviderError::Transient(_))));
    }
}
