use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
};
use serde::Serialize;
use serde_json::{Value, json};

use session_gate::{SessionError, require_user};

use super::error::status_for;
use super::session::AuthUser;
use super::state::AuthState;

pub(super) fn router(debug_endpoints: bool) -> Router<AuthState> {
    let router = Router::new().route("/auth/user", get(current_user));
    if debug_endpoints {
        router.route("/debug/session", get(debug_session))
    } else {
        router
    }
}

fn error_body(err: &SessionError) -> (StatusCode, Json<Value>) {
    let status = status_for(err);
    let label = match status {
        StatusCode::UNAUTHORIZED => "Unauthorized",
        StatusCode::BAD_GATEWAY => "Identity provider unavailable",
        _ => "Internal server error",
    };
    (status, Json(json!({ "error": label, "details": err.to_string() })))
}

/// `GET /api/auth/user`: the live user behind the request's session
#[tracing::instrument(skip_all)]
async fn current_user(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let client = state.client(&headers).map_err(|e| error_body(&e))?;
    let user = require_user(&client).await.map_err(|e| {
        tracing::debug!(error = %e, "User endpoint without live session");
        error_body(&e)
    })?;
    Ok(Json(json!({ "user": AuthUser::from(user) })))
}

#[derive(Debug, Serialize)]
struct DebugUser {
    id: String,
    email: Option<String>,
}

#[derive(Debug, Serialize)]
struct DebugSession {
    user_id: String,
}

#[derive(Debug, Serialize)]
struct DebugCookie {
    name: String,
    length: usize,
}

#[derive(Debug, Serialize)]
struct DebugReport {
    user: Option<DebugUser>,
    session: Option<DebugSession>,
    cookies: Vec<DebugCookie>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// `GET /api/debug/session`: cookie names and lengths, never values
async fn debug_session(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<Json<DebugReport>, (StatusCode, Json<Value>)> {
    let client = state.client(&headers).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    let cookies = client
        .cookies()
        .read_all()
        .iter()
        .map(|(name, value)| DebugCookie {
            name: name.clone(),
            length: value.len(),
        })
        .collect();

    let (user, error) = match client.get_current_user().await {
        Ok(user) => (
            Some(DebugUser {
                id: user.id,
                email: user.email,
            }),
            None,
        ),
        Err(e) => (None, Some(e.to_string())),
    };

    let session = client.get_session().map(|s| DebugSession {
        user_id: s.user.id,
    });

    tracing::debug!(
        user = ?user.as_ref().map(|u| &u.id),
        session = session.is_some(),
        "Session debug"
    );

    Ok(Json(DebugReport {
        user,
        session,
        cookies,
        error,
    }))
}
