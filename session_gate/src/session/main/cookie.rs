//! Cookie transport shim.
//!
//! [`CookieStore`] is the only place that reads the request `Cookie` header, and
//! [`write_all`] is the only place that writes `Set-Cookie` headers. Neither
//! filters nor validates what it is given.

use std::str::FromStr;

use cookie::Cookie;
use http::header::{COOKIE, HeaderMap, HeaderValue, SET_COOKIE};

use crate::session::errors::SessionError;

/// Default cookie lifetime, 400 days (the upper bound browsers honour)
pub(crate) const DEFAULT_COOKIE_MAX_AGE: i64 = 400 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl FromStr for SameSite {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "none" => Ok(Self::None),
            other => Err(SessionError::Config(format!("Invalid SameSite value: {other}"))),
        }
    }
}

impl From<SameSite> for cookie::SameSite {
    fn from(value: SameSite) -> Self {
        match value {
            SameSite::Strict => cookie::SameSite::Strict,
            SameSite::Lax => cookie::SameSite::Lax,
            SameSite::None => cookie::SameSite::None,
        }
    }
}

/// Attributes a cookie was issued with.
///
/// A rewritten cookie must carry the same attributes as the original or the
/// browser may store it as a separate cookie or drop it altogether.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: String,
    /// `None` makes the cookie host-only
    pub domain: Option<String>,
    /// Seconds; `None` makes it a browser-session cookie
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            max_age: Some(DEFAULT_COOKIE_MAX_AGE),
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
        }
    }
}

impl CookieOptions {
    /// Same attributes with an immediate expiry, used to delete a cookie
    pub fn expired(&self) -> Self {
        Self {
            max_age: Some(0),
            ..self.clone()
        }
    }
}

/// A single name/value/attributes write destined for the response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieEntry {
    pub name: String,
    pub value: String,
    pub options: CookieOptions,
}

impl CookieEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>, options: CookieOptions) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            options,
        }
    }

    pub fn removal(name: impl Into<String>, options: &CookieOptions) -> Self {
        Self::new(name, "", options.expired())
    }

    pub fn is_removal(&self) -> bool {
        self.options.max_age == Some(0)
    }

    /// Render as a `Set-Cookie` header value
    pub fn to_set_cookie(&self) -> String {
        let mut builder = Cookie::build((self.name.clone(), self.value.clone()))
            .path(self.options.path.clone())
            .secure(self.options.secure)
            .http_only(self.options.http_only)
            .same_site(self.options.same_site.into());
        if let Some(domain) = &self.options.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(max_age) = self.options.max_age {
            builder = builder.max_age(time::Duration::seconds(max_age));
        }
        builder.build().to_string()
    }
}

/// Request-scoped view of the cookies sent by the browser plus the writes
/// staged for the response.
///
/// Writes are reflected in the request view immediately, so a later read in
/// the same request sees the rotated value.
#[derive(Debug, Clone, Default)]
pub struct CookieStore {
    cookies: Vec<(String, String)>,
    pending: Vec<CookieEntry>,
}

impl CookieStore {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, SessionError> {
        let mut cookies = Vec::new();
        for header in headers.get_all(COOKIE) {
            let header = header.to_str().map_err(|e| {
                tracing::error!("Invalid cookie header: {}", e);
                SessionError::Cookie("Invalid cookie header".to_string())
            })?;
            for parsed in Cookie::split_parse(header) {
                match parsed {
                    Ok(c) => cookies.push((c.name().to_string(), c.value().to_string())),
                    Err(e) => tracing::debug!("Skipping malformed cookie pair: {}", e),
                }
            }
        }
        Ok(Self {
            cookies,
            pending: Vec::new(),
        })
    }

    pub fn from_pairs<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        Self {
            cookies: pairs
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
            pending: Vec::new(),
        }
    }

    /// All request cookies in the order the browser sent them
    pub fn read_all(&self) -> &[(String, String)] {
        &self.cookies
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Stage writes in the given order. The last write for a name wins.
    pub fn write_all<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = CookieEntry>,
    {
        for entry in entries {
            self.apply_to_request_view(&entry);
            match self.pending.iter_mut().find(|p| p.name == entry.name) {
                Some(existing) => *existing = entry,
                None => self.pending.push(entry),
            }
        }
    }

    pub fn pending(&self) -> &[CookieEntry] {
        &self.pending
    }

    pub fn take_pending(&mut self) -> Vec<CookieEntry> {
        std::mem::take(&mut self.pending)
    }

    /// Render the current request view as a `Cookie` header value.
    /// Returns `None` when no cookies remain.
    pub fn cookie_header(&self) -> Result<Option<HeaderValue>, SessionError> {
        if self.cookies.is_empty() {
            return Ok(None);
        }
        let joined = self
            .cookies
            .iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&joined)
            .map(Some)
            .map_err(|e| SessionError::Cookie(e.to_string()))
    }

    fn apply_to_request_view(&mut self, entry: &CookieEntry) {
        if entry.is_removal() {
            self.cookies.retain(|(n, _)| n != &entry.name);
            return;
        }
        let mut seen = false;
        self.cookies.retain_mut(|(n, v)| {
            if n != &entry.name {
                return true;
            }
            if seen {
                return false;
            }
            seen = true;
            *v = entry.value.clone();
            true
        });
        if !seen {
            self.cookies.push((entry.name.clone(), entry.value.clone()));
        }
    }
}

/// Write `Set-Cookie` headers for `entries`, in order.
///
/// A name already present among the response's `Set-Cookie` headers is
/// overwritten in place. Entries that cannot be encoded as a header are
/// skipped and reported through the returned error; the rest are still
/// written.
pub fn write_all(headers: &mut HeaderMap, entries: &[CookieEntry]) -> Result<(), SessionError> {
    let mut failed = Vec::new();

    for entry in entries {
        let value = match HeaderValue::from_str(&entry.to_set_cookie()) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(cookie = %entry.name, error = %e, "Failed to encode Set-Cookie header");
                failed.push(entry.name.clone());
                continue;
            }
        };
        replace_set_cookie(headers, &entry.name, value);
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(SessionError::CookiePropagation(format!(
            "Failed to write cookies: {}",
            failed.join(", ")
        )))
    }
}

fn replace_set_cookie(headers: &mut HeaderMap, name: &str, value: HeaderValue) {
    let existing: Vec<HeaderValue> = headers.get_all(SET_COOKIE).iter().cloned().collect();
    if !existing.iter().any(|v| set_cookie_name(v) == Some(name)) {
        headers.append(SET_COOKIE, value);
        return;
    }

    headers.remove(SET_COOKIE);
    let mut value = Some(value);
    for current in existing {
        if set_cookie_name(&current) == Some(name) {
            if let Some(v) = value.take() {
                headers.append(SET_COOKIE, v);
            }
        } else {
            headers.append(SET_COOKIE, current);
        }
    }
}

fn set_cookie_name(value: &HeaderValue) -> Option<&str> {
    let raw = value.to_str().ok()?;
    let pair = raw.split(';').next()?;
    pair.split('=').next().map(str::trim)
}
