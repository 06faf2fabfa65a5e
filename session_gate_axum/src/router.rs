//! Combined router for all authentication endpoints

use axum::Router;
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::config::AUTH_ROUTE_PREFIX;
use super::state::AuthState;

/// Create a router for all authentication endpoints
///
/// The endpoints will be available at:
/// - {AUTH_ROUTE_PREFIX}/callback, /signin, /signout
/// - /api/auth/user
/// - /api/debug/session, only when the gate config enables debug endpoints
///
/// Merge it into the application and layer [`access_gate`](crate::access_gate)
/// over the result.
pub fn auth_router(state: AuthState) -> Router {
    auth_router_no_trace(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Same as [`auth_router`] without the HTTP tracing middleware
pub fn auth_router_no_trace(state: AuthState) -> Router {
    let debug_endpoints = state.gate().debug_endpoints();
    if debug_endpoints {
        tracing::warn!("Session debug endpoint enabled");
    }
    Router::new()
        .nest(AUTH_ROUTE_PREFIX.as_str(), super::callback::router())
        .nest("/api", super::api::router(debug_endpoints))
        .with_state(state)
}
