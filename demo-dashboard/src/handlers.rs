use axum::{
    extract::Query,
    response::{Html, IntoResponse},
};
use std::collections::HashMap;

use session_gate_axum::AuthUser;

pub(crate) async fn index(user: Option<AuthUser>) -> impl IntoResponse {
    let greeting = match user {
        Some(u) => format!(
            "Signed in as {}. <a href=\"/dashboard\">Dashboard</a>",
            u.email.as_deref().unwrap_or(&u.id)
        ),
        None => "<a href=\"/auth/login\">Sign in</a>".to_string(),
    };
    Html(format!("<h1>Bookmarks</h1><p>{greeting}</p>"))
}

// Placeholder for the real login page; `error` carries the callback's failure reason
pub(crate) async fn login(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    let error = if params.contains_key("error") {
        "<p>Authentication failed. Please try again.</p>"
    } else {
        ""
    };
    Html(format!(
        "<h1>Sign in</h1>{error}<p><a href=\"/auth/signin?provider=google\">Continue with Google</a></p>"
    ))
}

pub(crate) async fn dashboard(user: AuthUser) -> impl IntoResponse {
    Html(format!(
        "<h1>Dashboard</h1><p>Hello, {}</p><form method=\"post\" action=\"/auth/signout\"><button>Sign out</button></form>",
        user.email.as_deref().unwrap_or(&user.id)
    ))
}
