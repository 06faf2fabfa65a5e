//! Route layout of the auth endpoints

use std::sync::LazyLock;

/// Mount point of the callback, sign-in and sign-out routes.
/// Default: "/auth"
pub static AUTH_ROUTE_PREFIX: LazyLock<String> =
    LazyLock::new(|| route_prefix(std::env::var("AUTH_ROUTE_PREFIX").ok().as_deref()));

/// Public origin of the site, e.g. "https://app.example.com".
/// When unset the origin is derived from the request's Host header.
pub static AUTH_SITE_URL: LazyLock<Option<String>> =
    LazyLock::new(|| site_url(std::env::var("AUTH_SITE_URL").ok().as_deref()));

pub(crate) const CALLBACK_PATH: &str = "/callback";
pub(crate) const SIGNIN_PATH: &str = "/signin";
pub(crate) const SIGNOUT_PATH: &str = "/signout";

pub(crate) const DEFAULT_OAUTH_PROVIDER: &str = "google";

fn route_prefix(env_value: Option<&str>) -> String {
    env_value
        .map(|s| s.trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .unwrap_or("/auth")
        .to_string()
}

fn site_url(env_value: Option<&str>) -> Option<String> {
    env_value
        .map(|s| s.trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
