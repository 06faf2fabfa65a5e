mod config;
mod errors;
mod main;
mod types;

pub use config::SessionConfig;
pub use errors::SessionError;
pub use main::{
    CookieEntry, CookieOptions, CookieStore, RefreshOutcome, SameSite, SessionClient, write_all,
};
pub use types::{AuthenticationOutcome, Session, User};
