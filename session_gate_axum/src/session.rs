use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    response::{IntoResponse, Redirect, Response},
};
use http::{Method, StatusCode, request::Parts};
use serde::Serialize;
use serde_json::{Map, Value};

use session_gate::{User, require_user};

use super::state::AuthState;

/// Rejection for [`AuthUser`]: browsers navigating with GET are sent to the
/// login page, everything else gets a plain 401.
#[derive(Debug, Clone)]
pub struct AuthRedirect {
    method: Method,
    login_path: String,
}

impl AuthRedirect {
    pub(crate) fn new(method: Method, login_path: impl Into<String>) -> Self {
        Self {
            method,
            login_path: login_path.into(),
        }
    }
}

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        if self.method == Method::GET {
            tracing::debug!(location = %self.login_path, "Redirecting to login");
            Redirect::temporary(&self.login_path).into_response()
        } else {
            tracing::debug!("Unauthorized");
            (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
    }
}

/// Authenticated user, available as an axum extractor.
///
/// Reuses the user resolved by [`access_gate`](crate::access_gate) or
/// [`protected_area_guard`](crate::protected_area_guard) for the same request
/// when either ran, and performs a live provider lookup otherwise.
///
/// ```no_run
/// use axum::{routing::get, Router};
/// use session_gate_axum::{AuthState, AuthUser};
///
/// async fn dashboard(user: AuthUser) -> String {
///     format!("Hello, {}!", user.email.as_deref().unwrap_or(&user.id))
/// }
///
/// fn app(state: AuthState) -> Router {
///     Router::new().route("/dashboard", get(dashboard)).with_state(state)
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub user_metadata: Map<String, Value>,
    pub app_metadata: Map<String, Value>,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            user_metadata: user.user_metadata,
            app_metadata: user.app_metadata,
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let state = AuthState::from_ref(state);
        let rejection = AuthRedirect::new(parts.method.clone(), state.gate().login_path());

        let client = state.client(&parts.headers).map_err(|e| {
            tracing::error!(error = %e, "Failed to read request cookies");
            rejection.clone()
        })?;

        let user = require_user(&client).await.map_err(|_| rejection)?;
        let user = AuthUser::from(user);
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let result: Result<Self, Self::Rejection> =
            <AuthUser as FromRequestParts<S>>::from_request_parts(parts, state).await;
        Ok(result.ok())
    }
}
