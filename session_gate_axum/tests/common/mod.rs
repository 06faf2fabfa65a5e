#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    middleware::from_fn_with_state,
    response::{Html, Response},
    routing::get,
};
use http::{
    Request,
    header::{COOKIE, HOST, LOCATION, SET_COOKIE},
};
use serde_json::Value;
use tower::ServiceExt;

use session_gate_axum::{
    AuthState, AuthUser, GateConfig, InMemoryProvider, SessionConfig, User, access_gate,
    auth_router_no_trace, protected_area_guard,
};

async fn dashboard(user: AuthUser) -> String {
    format!("dashboard:{}", user.id)
}

fn state(provider: Arc<InMemoryProvider>, gate: GateConfig) -> AuthState {
    AuthState::new(provider, SessionConfig::default(), gate)
}

fn pages(state: &AuthState) -> Router {
    let protected = Router::new()
        .route("/dashboard", get(dashboard))
        .route("/dashboard/{*rest}", get(dashboard))
        .route_layer(from_fn_with_state(state.clone(), protected_area_guard))
        .with_state(state.clone());

    Router::new()
        .route("/", get(|| async { Html("home") }))
        .route("/auth/login", get(|| async { Html("login") }))
        .merge(protected)
        .merge(auth_router_no_trace(state.clone()))
}

/// Application with the access gate in front of everything
pub fn app_with(provider: Arc<InMemoryProvider>, gate: GateConfig) -> Router {
    let state = state(provider, gate);
    pages(&state).layer(from_fn_with_state(state, access_gate))
}

pub fn app(provider: Arc<InMemoryProvider>) -> Router {
    app_with(provider, GateConfig::default())
}

/// Same routes with only the protected-area guard
pub fn app_without_gate(provider: Arc<InMemoryProvider>) -> Router {
    pages(&state(provider, GateConfig::default()))
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).header(HOST, "localhost:3000");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.expect("infallible")
}

pub fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

pub fn is_removal(set_cookie: &str) -> bool {
    set_cookie.contains("Max-Age=0")
}

/// Name and value of a `Set-Cookie` line
pub fn name_value(set_cookie: &str) -> (String, String) {
    let pair = set_cookie.split(';').next().unwrap_or_default();
    let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
    (name.trim().to_string(), value.trim().to_string())
}

/// Fold the response's cookie writes into the `Cookie` header the browser
/// would send next
pub fn next_cookie_header(previous: Option<&str>, response: &Response) -> Option<String> {
    let mut jar: Vec<(String, String)> = previous
        .map(|p| {
            p.split("; ")
                .filter_map(|c| c.split_once('='))
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default();

    for line in set_cookies(response) {
        let (name, value) = name_value(&line);
        jar.retain(|(n, _)| n != &name);
        if !is_removal(&line) {
            jar.push((name, value));
        }
    }

    if jar.is_empty() {
        None
    } else {
        Some(
            jar.iter()
                .map(|(n, v)| format!("{n}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Run the callback for a fresh code and return the browser's cookies
pub async fn login(app: &Router, provider: &InMemoryProvider, user: User) -> String {
    let code = provider.issue_code(user).expect("code issued");
    let response = send(app, get_request(&format!("/auth/callback?code={code}"), None)).await;
    assert_eq!(location(&response).as_deref(), Some("/dashboard"));
    next_cookie_header(None, &response).expect("session cookie")
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8_lossy(&bytes).into_owned()
}
