//! session-gate-axum - axum bindings for session-gate
//!
//! Provides the access gate and protected-area guard as axum middleware, an
//! [`AuthUser`] extractor, and the OAuth callback, sign-in and sign-out routes.
//!
//! ```no_run
//! use axum::{Router, middleware::from_fn_with_state, routing::get};
//! use session_gate_axum::{AuthState, AuthUser, access_gate, auth_router, protected_area_guard};
//!
//! async fn dashboard(user: AuthUser) -> String {
//!     format!("Hello, {}", user.id)
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AuthState::from_env()?;
//! let protected = Router::new()
//!     .route("/dashboard", get(dashboard))
//!     .route_layer(from_fn_with_state(state.clone(), protected_area_guard))
//!     .with_state(state.clone());
//! let app: Router = Router::new()
//!     .merge(protected)
//!     .merge(auth_router(state.clone()))
//!     .layer(from_fn_with_state(state, access_gate));
//! # Ok(())
//! # }
//! ```

mod api;
mod callback;
mod config;
mod error;
mod middleware;
mod router;
mod session;
mod state;

pub use config::{AUTH_ROUTE_PREFIX, AUTH_SITE_URL};
pub use error::IntoResponseError;
pub use middleware::{access_gate, protected_area_guard};
pub use router::{auth_router, auth_router_no_trace};
pub use session::{AuthRedirect, AuthUser};
pub use state::AuthState;

pub use session_gate::{
    GateConfig, IdentityProvider, InMemoryProvider, SessionConfig, SessionError, User,
};
