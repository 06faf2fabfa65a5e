use crate::session::{AuthenticationOutcome, CookieEntry, SessionClient};

use super::config::GateConfig;
use super::matcher::RouteClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Hand the request on to routing
    Continue,
    /// Answer with a redirect to the login page
    RedirectToLogin,
}

/// Result of one pass of the access gate.
///
/// `cookies` must reach the browser whatever the decision is.
#[derive(Debug)]
pub struct GateOutcome {
    pub decision: GateDecision,
    pub outcome: AuthenticationOutcome,
    pub cookies: Vec<CookieEntry>,
}

/// Refresh the session, then decide whether the request may proceed.
///
/// Protected paths need an `Authenticated` outcome; a provider outage counts
/// as not authenticated. Public paths always continue.
#[tracing::instrument(skip(client, config))]
pub async fn evaluate(client: &mut SessionClient, path: &str, config: &GateConfig) -> GateOutcome {
    let refreshed = client.refresh_if_needed().await;

    let decision = match (config.matcher.classify(path), &refreshed.outcome) {
        (RouteClass::Public, _) => GateDecision::Continue,
        (RouteClass::Protected, AuthenticationOutcome::Authenticated(_)) => GateDecision::Continue,
        (RouteClass::Protected, AuthenticationOutcome::TransientError(e)) => {
            tracing::warn!(error = %e, "Provider unavailable, denying protected path");
            GateDecision::RedirectToLogin
        }
        (RouteClass::Protected, AuthenticationOutcome::Unauthenticated) => {
            tracing::debug!("No session for protected path");
            GateDecision::RedirectToLogin
        }
    };

    GateOutcome {
        decision,
        outcome: refreshed.outcome,
        cookies: refreshed.cookies,
    }
}

/// Decision when the gate could not run at all, e.g. an unreadable `Cookie`
/// header. Lets the request through unless the gate is configured to fail
/// closed and the path is protected.
pub fn decide_on_error(path: &str, config: &GateConfig) -> GateDecision {
    if config.fail_closed && config.matcher.classify(path) == RouteClass::Protected {
        GateDecision::RedirectToLogin
    } else {
        GateDecision::Continue
    }
}
