use std::env;

use crate::session::SessionError;

use super::matcher::{RouteClass, RouteMatcher};

const DEFAULT_LOGIN_PATH: &str = "/auth/login";
const DEFAULT_PROTECTED_ROOT: &str = "/dashboard";
const DEFAULT_EXCLUDED_PREFIXES: [&str; 4] = ["/static/", "/assets/", "/favicon.ico", "/public"];

/// Routing side of the gate: where to send people and which paths to check
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub(crate) login_path: String,
    pub(crate) protected_root: String,
    pub(crate) matcher: RouteMatcher,
    pub(crate) fail_closed: bool,
    pub(crate) debug_endpoints: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        let excluded = DEFAULT_EXCLUDED_PREFIXES
            .iter()
            .copied()
            .chain([DEFAULT_LOGIN_PATH]);
        Self {
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            protected_root: DEFAULT_PROTECTED_ROOT.to_string(),
            matcher: RouteMatcher::new([DEFAULT_PROTECTED_ROOT], excluded),
            fail_closed: false,
            debug_endpoints: false,
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn check_path(name: &str, path: &str) -> Result<(), SessionError> {
    if !path.starts_with('/') || path.starts_with("//") {
        return Err(SessionError::Config(format!(
            "{name} must be an absolute path on this site: {path}"
        )));
    }
    Ok(())
}

impl GateConfig {
    /// Load from environment.
    ///
    /// Reads `AUTH_LOGIN_PATH`, `AUTH_PROTECTED_ROOT`, `AUTH_PROTECTED_PREFIXES`,
    /// `AUTH_GATE_EXCLUDED_PREFIXES`, `AUTH_GATE_FAIL_CLOSED` and
    /// `AUTH_DEBUG_ENDPOINTS`. The login page is always excluded from the gate.
    pub fn from_env() -> Result<Self, SessionError> {
        let login_path =
            env::var("AUTH_LOGIN_PATH").unwrap_or_else(|_| DEFAULT_LOGIN_PATH.to_string());
        let protected_root =
            env::var("AUTH_PROTECTED_ROOT").unwrap_or_else(|_| DEFAULT_PROTECTED_ROOT.to_string());

        let protected = env::var("AUTH_PROTECTED_PREFIXES")
            .map(|v| RouteMatcher::parse_list(&v))
            .unwrap_or_else(|_| vec![protected_root.clone()]);
        let excluded = env::var("AUTH_GATE_EXCLUDED_PREFIXES")
            .map(|v| RouteMatcher::parse_list(&v))
            .unwrap_or_else(|_| DEFAULT_EXCLUDED_PREFIXES.map(String::from).to_vec());

        let config = Self {
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            protected_root,
            matcher: RouteMatcher::new(protected, excluded),
            fail_closed: env_flag("AUTH_GATE_FAIL_CLOSED"),
            debug_endpoints: env_flag("AUTH_DEBUG_ENDPOINTS"),
        }
        .with_login_path(login_path);
        config.validate()?;
        Ok(config)
    }

    /// Reject off-site paths and a login page inside the protected area.
    ///
    /// `from_env` calls this; a config assembled with the `with_*` builders
    /// should be checked once before use.
    pub fn validate(&self) -> Result<(), SessionError> {
        check_path("AUTH_LOGIN_PATH", &self.login_path)?;
        check_path("AUTH_PROTECTED_ROOT", &self.protected_root)?;
        if self.matcher.classify(&self.login_path) == RouteClass::Protected {
            return Err(SessionError::Config(format!(
                "Login path {} is inside the protected area",
                self.login_path
            )));
        }
        Ok(())
    }

    /// Set the login page; it is added to the gate's excluded prefixes
    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self.matcher.exclude(&self.login_path);
        self
    }

    #[must_use]
    pub fn with_protected_root(mut self, path: impl Into<String>) -> Self {
        self.protected_root = path.into();
        self
    }

    /// Replace the route rules, keeping the login page excluded
    #[must_use]
    pub fn with_matcher(mut self, matcher: RouteMatcher) -> Self {
        self.matcher = matcher;
        self.matcher.exclude(&self.login_path);
        self
    }

    #[must_use]
    pub fn with_fail_closed(mut self, fail_closed: bool) -> Self {
        self.fail_closed = fail_closed;
        self
    }

    #[must_use]
    pub fn with_debug_endpoints(mut self, enabled: bool) -> Self {
        self.debug_endpoints = enabled;
        self
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn protected_root(&self) -> &str {
        &self.protected_root
    }

    pub fn matcher(&self) -> &RouteMatcher {
        &self.matcher
    }

    pub fn fail_closed(&self) -> bool {
        self.fail_closed
    }

    pub fn debug_endpoints(&self) -> bool {
        self.debug_endpoints
    }
}
