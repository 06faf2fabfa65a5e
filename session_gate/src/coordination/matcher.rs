/// Whether a request path needs an authenticated session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Protected,
    Public,
}

/// Plain prefix rules deciding which paths the gate looks at and which of
/// those are protected.
///
/// Prefixes are compared as raw strings, so `/dashboard` also covers
/// `/dashboard-old`. Over-matching errs on the protected side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatcher {
    protected: Vec<String>,
    excluded: Vec<String>,
}

fn clean(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    prefixes
        .into_iter()
        .map(Into::into)
        .map(|p: String| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

impl RouteMatcher {
    pub fn new(
        protected: impl IntoIterator<Item = impl Into<String>>,
        excluded: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            protected: clean(protected),
            excluded: clean(excluded),
        }
    }

    /// Split a comma separated prefix list, as found in environment variables
    pub fn parse_list(raw: &str) -> Vec<String> {
        clean(raw.split(','))
    }

    pub fn protected_prefixes(&self) -> &[String] {
        &self.protected
    }

    pub fn excluded_prefixes(&self) -> &[String] {
        &self.excluded
    }

    /// Add `prefix` to the excluded list unless it is already there
    pub fn exclude(&mut self, prefix: &str) {
        let prefix = prefix.trim();
        if !prefix.is_empty() && !self.excluded.iter().any(|p| p == prefix) {
            self.excluded.push(prefix.to_string());
        }
    }

    /// True if the gate should run for `path` at all
    pub fn intercepts(&self, path: &str) -> bool {
        !self.excluded.iter().any(|p| path.starts_with(p.as_str()))
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        if self.protected.iter().any(|p| path.starts_with(p.as_str())) {
            RouteClass::Protected
        } else {
            RouteClass::Public
        }
    }
}
