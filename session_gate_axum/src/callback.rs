use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, Method, StatusCode, header},
    response::Redirect,
    routing::get,
};
use serde::Deserialize;

use session_gate::{
    CallbackOutcome, CallbackParams, CallbackResult, CookieEntry, LoginErrorReason, handle_callback,
    write_all,
};

use super::config::{
    AUTH_ROUTE_PREFIX, AUTH_SITE_URL, CALLBACK_PATH, DEFAULT_OAUTH_PROVIDER, SIGNIN_PATH,
    SIGNOUT_PATH,
};
use super::error::IntoResponseError;
use super::state::AuthState;

pub(super) fn router() -> Router<AuthState> {
    Router::new()
        .route(CALLBACK_PATH, get(callback))
        .route(SIGNIN_PATH, get(signin))
        .route(SIGNOUT_PATH, get(signout).post(signout))
}

fn set_cookies(cookies: &[CookieEntry]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Err(e) = write_all(&mut headers, cookies) {
        tracing::error!(error = %e, "Failed to propagate session cookies");
    }
    headers
}

/// `GET /auth/callback`: the identity provider's redirect target
async fn callback(
    State(state): State<AuthState>,
    headers: HeaderMap,
    query: Result<Query<CallbackParams>, QueryRejection>,
) -> (HeaderMap, Redirect) {
    let result = match (state.client(&headers), query) {
        (Ok(client), Ok(Query(params))) => handle_callback(client, &params).await,
        (Err(e), _) => {
            tracing::error!(error = %e, "Unreadable cookies on callback");
            unprocessable()
        }
        (_, Err(e)) => {
            tracing::error!(error = %e, "Unparseable callback query");
            unprocessable()
        }
    };

    let location = result.outcome.location(state.gate());
    tracing::debug!(location = %location, "Callback redirect");
    (set_cookies(&result.cookies), Redirect::temporary(&location))
}

fn unprocessable() -> CallbackResult {
    CallbackResult {
        outcome: CallbackOutcome::RedirectLoginError(LoginErrorReason::CallbackError),
        cookies: Vec::new(),
    }
}

#[derive(Debug, Deserialize)]
struct SigninParams {
    provider: Option<String>,
}

/// Scheme and host the browser used to reach us
fn request_origin(headers: &HeaderMap) -> Option<String> {
    if let Some(site) = AUTH_SITE_URL.as_ref() {
        return Some(site.clone());
    }
    let host = headers.get(header::HOST)?.to_str().ok()?;
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .unwrap_or_else(|| {
            if host.starts_with("localhost") || host.starts_with("127.0.0.1") {
                "http"
            } else {
                "https"
            }
        });
    Some(format!("{proto}://{host}"))
}

/// `GET /auth/signin?provider=google`: start the OAuth flow
async fn signin(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Query(params): Query<SigninParams>,
) -> Result<(HeaderMap, Redirect), (StatusCode, String)> {
    let provider = params
        .provider
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_OAUTH_PROVIDER.to_string());

    let origin = request_origin(&headers)
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "Missing Host header".to_string()))?;
    let redirect_to = format!("{origin}{}{CALLBACK_PATH}", AUTH_ROUTE_PREFIX.as_str());

    let mut client = state.client(&headers).into_response_error()?;
    let url = client
        .sign_in_with_oauth(&provider, &redirect_to)
        .into_response_error()?;

    Ok((
        set_cookies(&client.take_cookie_writes()),
        Redirect::temporary(&url),
    ))
}

/// True for a top-level GET the browser reports as coming from another site
fn cross_site_get(method: &Method, headers: &HeaderMap) -> bool {
    *method == Method::GET
        && headers
            .get("sec-fetch-site")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("cross-site"))
}

/// `GET|POST /auth/signout`
///
/// Prefer POST from application pages. Session cookies are `SameSite=Lax`,
/// so they ride along on a cross-site GET link; such a GET is ignored when
/// the browser labels it with `Sec-Fetch-Site: cross-site`.
async fn signout(
    State(state): State<AuthState>,
    method: Method,
    headers: HeaderMap,
) -> (HeaderMap, Redirect) {
    if cross_site_get(&method, &headers) {
        tracing::warn!("Ignoring cross-site sign-out request");
        return (
            HeaderMap::new(),
            Redirect::temporary(state.gate().protected_root()),
        );
    }

    let login = Redirect::temporary(state.gate().login_path());
    match state.client(&headers) {
        Ok(mut client) => {
            client.sign_out().await;
            (set_cookies(&client.take_cookie_writes()), login)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Sign-out with unreadable cookies");
            (HeaderMap::new(), login)
        }
    }
}
