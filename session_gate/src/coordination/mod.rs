mod callback;
mod config;
mod gate;
mod guard;
mod matcher;

pub use callback::{
    CallbackOutcome, CallbackParams, CallbackResult, LoginErrorReason, handle_callback,
    login_redirect_url,
};
pub use config::GateConfig;
pub use gate::{GateDecision, GateOutcome, decide_on_error, evaluate};
pub use guard::require_user;
pub use matcher::{RouteClass, RouteMatcher};
