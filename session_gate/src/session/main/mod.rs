mod cookie;
mod session;
mod session_cookie;

pub use cookie::{CookieEntry, CookieOptions, CookieStore, SameSite, write_all};
pub use session::{RefreshOutcome, SessionClient};

pub(crate) use cookie::DEFAULT_COOKIE_MAX_AGE;
