mod config;
mod errors;
mod http;
mod memory;
mod traits;
mod types;

pub use config::ProviderConfig;
pub use errors::ProviderError;
pub use http::HttpIdentityProvider;
pub use memory::InMemoryProvider;
pub use traits::IdentityProvider;

use std::sync::Arc;

/// Build the provider named by the environment.
///
/// Uses [`HttpIdentityProvider`] when `AUTH_PROVIDER_URL` is set and falls back
/// to an empty [`InMemoryProvider`] otherwise.
pub fn provider_from_env() -> Result<Arc<dyn IdentityProvider>, ProviderError> {
    match ProviderConfig::from_env()? {
        Some(config) => {
            tracing::info!(url = %config.base_url, "Using HTTP identity provider");
            Ok(Arc::new(HttpIdentityProvider::new(config)?))
        }
        None => {
            tracing::warn!(
                "AUTH_PROVIDER_URL not set, using in-memory identity provider; \
                 OAuth sign-in is unavailable until AUTH_PROVIDER_URL names the provider base URL"
            );
            Ok(Arc::new(InMemoryProvider::new()))
        }
    }
}
