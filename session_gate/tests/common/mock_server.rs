//! GoTrue-style identity provider served by axum on an ephemeral port

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

pub const API_KEY: &str = "test-api-key";
pub const GOOD_CODE: &str = "abc123";
pub const EMPTY_CODE: &str = "empty-session";
pub const FAILING_CODE: &str = "provider-crash";
pub const VALID_REFRESH: &str = "refresh-1";
pub const VALID_ACCESS: &str = "access-1";
pub const ROTATED_ACCESS: &str = "access-2";
pub const SLOW_ACCESS: &str = "slow-token";

#[derive(Clone, Default)]
pub struct MockState {
    used_codes: Arc<Mutex<HashSet<String>>>,
    pub logouts: Arc<Mutex<Vec<String>>>,
}

pub struct MockServer {
    pub base_url: String,
    pub state: MockState,
}

#[derive(Deserialize)]
struct GrantQuery {
    grant_type: String,
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn has_api_key(headers: &HeaderMap) -> bool {
    headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(API_KEY)
}

fn user_json() -> Value {
    json!({
        "id": "8b0c5d1e-0000-4000-8000-000000000001",
        "email": "someone@example.com",
        "user_metadata": {"full_name": "Some One"},
        "app_metadata": {"provider": "google"}
    })
}

fn token_json(access: &str, refresh: &str) -> Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer",
        "expires_in": 3600,
        "user": user_json()
    })
}

fn error(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

async fn token(
    State(state): State<MockState>,
    Query(query): Query<GrantQuery>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !has_api_key(&headers) {
        return error(StatusCode::UNAUTHORIZED, json!({"message": "No API key found in request"}));
    }

    match query.grant_type.as_str() {
        "pkce" => {
            let code = body["auth_code"].as_str().unwrap_or_default().to_string();
            let first_use = state
                .used_codes
                .lock()
                .expect("mock state lock")
                .insert(code.clone());
            match code.as_str() {
                FAILING_CODE => error(StatusCode::INTERNAL_SERVER_ERROR, json!({"msg": "boom"})),
                EMPTY_CODE => (StatusCode::OK, Json(json!({}))).into_response(),
                GOOD_CODE if first_use => {
                    Json(token_json(VALID_ACCESS, VALID_REFRESH)).into_response()
                }
                _ => error(
                    StatusCode::BAD_REQUEST,
                    json!({"error": "invalid_grant", "error_description": "Invalid flow state"}),
                ),
            }
        }
        "refresh_token" => match body["refresh_token"].as_str() {
            Some(VALID_REFRESH) => Json(token_json(ROTATED_ACCESS, "refresh-2")).into_response(),
            _ => error(
                StatusCode::BAD_REQUEST,
                json!({"error": "invalid_grant", "error_description": "Invalid Refresh Token"}),
            ),
        },
        _ => error(StatusCode::BAD_REQUEST, json!({"error": "unsupported_grant_type"})),
    }
}

async fn user(headers: HeaderMap) -> Response {
    match bearer(&headers).as_deref() {
        Some(VALID_ACCESS) | Some(ROTATED_ACCESS) => Json(user_json()).into_response(),
        Some(SLOW_ACCESS) => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(user_json()).into_response()
        }
        _ => error(StatusCode::UNAUTHORIZED, json!({"code": 401, "msg": "invalid JWT"})),
    }
}

async fn logout(State(state): State<MockState>, headers: HeaderMap) -> StatusCode {
    match bearer(&headers) {
        Some(token) => {
            state.logouts.lock().expect("mock state lock").push(token);
            StatusCode::NO_CONTENT
        }
        None => StatusCode::UNAUTHORIZED,
    }
}

/// Start a fresh mock provider for one test
pub async fn start() -> MockServer {
    let state = MockState::default();
    let app = Router::new()
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/user", get(user))
        .route("/auth/v1/logout", post(logout))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });

    MockServer {
        base_url: format!("http://{addr}"),
        state,
    }
}
