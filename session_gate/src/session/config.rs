use std::env;

use chrono::Duration;

use crate::session::errors::SessionError;
use crate::session::main::{CookieOptions, DEFAULT_COOKIE_MAX_AGE, SameSite};

const DEFAULT_SESSION_COOKIE_NAME: &str = "__Host-AuthToken";
const DEFAULT_REFRESH_MARGIN_SECS: i64 = 90;

/// How sessions are persisted in cookies and when they are refreshed
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub(crate) cookie_name: String,
    pub(crate) cookie_options: CookieOptions,
    pub(crate) refresh_margin: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_SESSION_COOKIE_NAME.to_string(),
            cookie_options: CookieOptions::default(),
            refresh_margin: Duration::seconds(DEFAULT_REFRESH_MARGIN_SECS),
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|val| !matches!(val.to_lowercase().as_str(), "false" | "0" | "no"))
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl SessionConfig {
    /// Load from environment.
    ///
    /// * `SESSION_COOKIE_NAME` - default `__Host-AuthToken`
    /// * `SESSION_COOKIE_MAX_AGE` - seconds, default 400 days
    /// * `SESSION_COOKIE_SECURE` / `SESSION_COOKIE_HTTP_ONLY` - default `true`
    /// * `SESSION_COOKIE_SAME_SITE` - `lax` (default), `strict` or `none`
    /// * `SESSION_COOKIE_DOMAIN` - unset for host-only cookies
    /// * `SESSION_REFRESH_MARGIN_SECS` - refresh this long before expiry, default 90
    pub fn from_env() -> Result<Self, SessionError> {
        let same_site = match env::var("SESSION_COOKIE_SAME_SITE") {
            Ok(value) => value.parse::<SameSite>()?,
            Err(_) => SameSite::Lax,
        };

        let cookie_options = CookieOptions {
            path: "/".to_string(),
            domain: env::var("SESSION_COOKIE_DOMAIN")
                .ok()
                .filter(|d| !d.is_empty()),
            max_age: Some(env_i64("SESSION_COOKIE_MAX_AGE", DEFAULT_COOKIE_MAX_AGE)),
            secure: env_bool("SESSION_COOKIE_SECURE", true),
            http_only: env_bool("SESSION_COOKIE_HTTP_ONLY", true),
            same_site,
        };

        let margin_secs = env_i64("SESSION_REFRESH_MARGIN_SECS", DEFAULT_REFRESH_MARGIN_SECS);
        let refresh_margin = Duration::try_seconds(margin_secs)
            .filter(|m| *m >= Duration::zero())
            .ok_or_else(|| {
                SessionError::Config(format!(
                    "SESSION_REFRESH_MARGIN_SECS out of range: {margin_secs}"
                ))
            })?;

        let config = Self {
            cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| DEFAULT_SESSION_COOKIE_NAME.to_string()),
            cookie_options,
            refresh_margin,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cookie attributes the browser would otherwise silently reject
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.cookie_name.is_empty() {
            return Err(SessionError::Config("Session cookie name is empty".to_string()));
        }
        if self.cookie_name.starts_with("__Host-")
            && (!self.cookie_options.secure
                || self.cookie_options.domain.is_some()
                || self.cookie_options.path != "/")
        {
            return Err(SessionError::Config(format!(
                "Cookie {} requires Secure, Path=/ and no Domain",
                self.cookie_name
            )));
        }
        if self.cookie_name.starts_with("__Secure-") && !self.cookie_options.secure {
            return Err(SessionError::Config(format!(
                "Cookie {} requires Secure",
                self.cookie_name
            )));
        }
        if self.cookie_options.same_site == SameSite::None && !self.cookie_options.secure {
            return Err(SessionError::Config(
                "SameSite=None requires Secure".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_cookie_options(mut self, options: CookieOptions) -> Self {
        self.cookie_options = options;
        self
    }

    #[must_use]
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn cookie_options(&self) -> &CookieOptions {
        &self.cookie_options
    }

    pub(crate) fn code_verifier_cookie_name(&self) -> String {
        format!("{}-code-verifier", self.cookie_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Helper function to set an environment variable for the duration of the test
    /// and restore the original value afterward.
    fn with_env_vars<F, R>(vars: &[(&str, Option<&str>)], test: F) -> R
    where
        F: FnOnce() -> R,
    {
        let originals: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(k, _)| (k.to_string(), env::var(k).ok()))
            .collect();

        for (key, value) in vars {
            match value {
                Some(val) => unsafe { env::set_var(key, val) },
                None => unsafe { env::remove_var(key) },
            }
        }

        let result = test();

        for (key, original) in originals {
            match original {
                Some(val) => unsafe { env::set_var(&key, val) },
                None => unsafe { env::remove_var(&key) },
            }
        }

        result
    }

    const ALL_VARS: [&str; 7] = [
        "SESSION_COOKIE_NAME",
        "SESSION_COOKIE_MAX_AGE",
        "SESSION_COOKIE_SECURE",
        "SESSION_COOKIE_HTTP_ONLY",
        "SESSION_COOKIE_SAME_SITE",
        "SESSION_COOKIE_DOMAIN",
        "SESSION_REFRESH_MARGIN_SECS",
    ];

    fn cleared() -> Vec<(&'static str, Option<&'static str>)> {
        ALL_VARS.iter().map(|k| (*k, None)).collect()
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        let config = with_env_vars(&cleared(), SessionConfig::from_env).expect("valid defaults");

        assert_eq!(config.cookie_name(), "__Host-AuthToken");
        assert_eq!(config.cookie_options().path, "/");
        assert!(config.cookie_options().secure);
        assert!(config.cookie_options().http_only);
        assert_eq!(config.cookie_options().same_site, SameSite::Lax);
        assert_eq!(config.cookie_options().max_age, Some(DEFAULT_COOKIE_MAX_AGE));
        assert_eq!(config.refresh_margin, Duration::seconds(90));
    }

    #[test]
    #[serial]
    fn test_from_env_custom_values() {
        let mut vars = cleared();
        vars.extend([
            ("SESSION_COOKIE_NAME", Some("app-auth")),
            ("SESSION_COOKIE_MAX_AGE", Some("1800")),
            ("SESSION_COOKIE_SECURE", Some("false")),
            ("SESSION_COOKIE_SAME_SITE", Some("strict")),
            ("SESSION_COOKIE_DOMAIN", Some("example.com")),
            ("SESSION_REFRESH_MARGIN_SECS", Some("30")),
        ]);
        let config = with_env_vars(&vars, SessionConfig::from_env).expect("valid config");

        assert_eq!(config.cookie_name(), "app-auth");
        assert_eq!(config.cookie_options().max_age, Some(1800));
        assert!(!config.cookie_options().secure);
        assert_eq!(config.cookie_options().same_site, SameSite::Strict);
        assert_eq!(config.cookie_options().domain.as_deref(), Some("example.com"));
        assert_eq!(config.refresh_margin, Duration::seconds(30));
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_number_falls_back_to_default() {
        let mut vars = cleared();
        vars.push(("SESSION_COOKIE_MAX_AGE", Some("invalid")));
        let config = with_env_vars(&vars, SessionConfig::from_env).expect("valid config");
        assert_eq!(config.cookie_options().max_age, Some(DEFAULT_COOKIE_MAX_AGE));
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_out_of_range_refresh_margin() {
        for margin in ["9000000000000000", "-5"] {
            let mut vars = cleared();
            vars.push(("SESSION_REFRESH_MARGIN_SECS", Some(margin)));
            let result = with_env_vars(&vars, SessionConfig::from_env);
            assert!(matches!(result, Err(SessionError::Config(_))), "margin {margin}");
        }
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_invalid_same_site() {
        let mut vars = cleared();
        vars.push(("SESSION_COOKIE_SAME_SITE", Some("sometimes")));
        let result = with_env_vars(&vars, SessionConfig::from_env);
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_host_prefix_without_secure() {
        let mut vars = cleared();
        vars.push(("SESSION_COOKIE_SECURE", Some("false")));
        let result = with_env_vars(&vars, SessionConfig::from_env);
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_validate_host_prefix_rejects_domain() {
        let config = SessionConfig::default().with_cookie_options(CookieOptions {
            domain: Some("example.com".to_string()),
            ..CookieOptions::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_same_site_none_requires_secure() {
        let config = SessionConfig::default()
            .with_cookie_name("plain")
            .with_cookie_options(CookieOptions {
                secure: false,
                same_site: SameSite::None,
                ..CookieOptions::default()
            });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_code_verifier_cookie_name() {
        let config = SessionConfig::default().with_cookie_name("auth");
        assert_eq!(config.code_verifier_cookie_name(), "auth-code-verifier");
    }
}
