use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use http::header::{COOKIE, SET_COOKIE};

use session_gate::{
    AuthenticationOutcome, CookieEntry, GateDecision, SessionClient, decide_on_error, evaluate,
    require_user, write_all,
};

use super::session::AuthUser;
use super::state::AuthState;

fn login_redirect(state: &AuthState) -> Response {
    Redirect::temporary(state.gate().login_path()).into_response()
}

/// Put staged cookie writes on the outbound response. A cookie that cannot
/// be written is logged and the response goes out without it.
pub(crate) fn propagate_cookies(response: &mut Response, cookies: &[CookieEntry]) {
    if let Err(e) = write_all(response.headers_mut(), cookies) {
        tracing::error!(error = %e, "Failed to propagate session cookies");
    }
}

/// True if a handler already answered with its own `Set-Cookie` for `name`
fn set_by_handler(response: &Response, name: &str) -> bool {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split_once('='))
        .any(|(n, _)| n.trim() == name)
}

/// Make the rotated session visible to everything downstream of the gate
fn forward_cookies(req: &mut Request, client: &SessionClient) {
    match client.cookies().cookie_header() {
        Ok(Some(value)) => {
            req.headers_mut().insert(COOKIE, value);
        }
        Ok(None) => {
            req.headers_mut().remove(COOKIE);
        }
        Err(e) => tracing::warn!(error = %e, "Could not rewrite request cookies"),
    }
}

/// Access gate, to be layered over the whole application with
/// `axum::middleware::from_fn_with_state`.
///
/// Refreshes the session on every intercepted request, sends unauthenticated
/// requests for protected paths to the login page, and always carries the
/// rotated cookies on whichever response goes out.
pub async fn access_gate(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if !state.gate().matcher().intercepts(&path) {
        return next.run(req).await;
    }

    let mut client = match state.client(req.headers()) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, path = %path, "Access gate could not run");
            return match decide_on_error(&path, state.gate()) {
                GateDecision::Continue => next.run(req).await,
                GateDecision::RedirectToLogin => login_redirect(&state),
            };
        }
    };

    let gate = evaluate(&mut client, &path, state.gate()).await;

    let mut response = match gate.decision {
        GateDecision::RedirectToLogin => {
            tracing::debug!(path = %path, "Redirecting to login");
            login_redirect(&state)
        }
        GateDecision::Continue => {
            forward_cookies(&mut req, &client);
            if let AuthenticationOutcome::Authenticated(user) = gate.outcome {
                req.extensions_mut().insert(AuthUser::from(user));
            }
            next.run(req).await
        }
    };

    // a handler that set the session itself (callback, sign-out) is newer than the gate
    let cookies: Vec<CookieEntry> = gate
        .cookies
        .into_iter()
        .filter(|c| !set_by_handler(&response, &c.name))
        .collect();
    propagate_cookies(&mut response, &cookies);
    response
}

/// Protected-area guard, to be layered over the protected routes only.
///
/// Does its own live user lookup and does not depend on [`access_gate`]
/// having run. Any failure redirects to the login page.
pub async fn protected_area_guard(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let client = match state.client(req.headers()) {
        Ok(client) => client,
        Err(e) => {
            tracing::debug!(error = %e, "Guard could not read request cookies");
            return login_redirect(&state);
        }
    };

    match require_user(&client).await {
        Ok(user) => {
            req.extensions_mut().insert(AuthUser::from(user));
            next.run(req).await
        }
        Err(_) => login_redirect(&state),
    }
}
