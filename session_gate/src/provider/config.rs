use std::{env, time::Duration};

use url::Url;

use super::errors::ProviderError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the identity provider lives and how to talk to it
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub(crate) base_url: Url,
    pub(crate) api_key: Option<String>,
    pub(crate) timeout: Duration,
}

impl ProviderConfig {
    pub fn new(base_url: &str) -> Result<Self, ProviderError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ProviderError::Config(format!("Invalid provider URL {base_url}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ProviderError::Config(format!(
                "Provider URL must be http(s): {base_url}"
            )));
        }
        Ok(Self {
            base_url,
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Load from `AUTH_PROVIDER_URL`, `AUTH_PROVIDER_API_KEY` and
    /// `AUTH_PROVIDER_TIMEOUT_SECS`.
    ///
    /// Returns `Ok(None)` when no provider URL is configured.
    pub fn from_env() -> Result<Option<Self>, ProviderError> {
        let Some(url) = env::var("AUTH_PROVIDER_URL").ok().filter(|u| !u.is_empty()) else {
            return Ok(None);
        };

        let timeout = env::var("AUTH_PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let mut config = Self::new(&url)?.with_timeout(Duration::from_secs(timeout));
        if let Some(key) = env::var("AUTH_PROVIDER_API_KEY").ok().filter(|k| !k.is_empty()) {
            config = config.with_api_key(key);
        }
        Ok(Some(config))
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve an endpoint path relative to the provider base URL
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| ProviderError::Config(format!("Invalid endpoint {path}: {e}")))
    }
}
