//! session-gate - OAuth session lifecycle for server-side web applications
//!
//! Exchanges authorization codes for sessions, keeps sessions in cookies,
//! refreshes them on every request and keeps unauthenticated requests out of
//! the protected area. Framework independent; see `session-gate-axum` for the
//! axum bindings.

mod coordination;
mod provider;
mod session;
mod utils;

pub use coordination::{
    CallbackOutcome, CallbackParams, CallbackResult, GateConfig, GateDecision, GateOutcome,
    LoginErrorReason, RouteClass, RouteMatcher, decide_on_error, evaluate, handle_callback,
    login_redirect_url, require_user,
};

pub use provider::{
    HttpIdentityProvider, IdentityProvider, InMemoryProvider, ProviderConfig, ProviderError,
    provider_from_env,
};

pub use session::{
    AuthenticationOutcome, CookieEntry, CookieOptions, CookieStore, RefreshOutcome, SameSite,
    Session, SessionClient, SessionConfig, SessionError, User, write_all,
};

pub use utils::UtilError;
