use axum::{Router, middleware::from_fn_with_state, routing::get};
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use session_gate_axum::{AuthState, access_gate, auth_router, protected_area_guard};

mod handlers;
mod server;

use crate::{
    handlers::{dashboard, index, login},
    server::spawn_http_server,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "{}=debug,session_gate=debug,session_gate_axum=debug",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AuthState::from_env()?;

    let protected = Router::new()
        .route("/dashboard", get(dashboard))
        .route("/dashboard/{*rest}", get(dashboard))
        .route_layer(from_fn_with_state(state.clone(), protected_area_guard));

    let app = Router::new()
        .route("/", get(index))
        .route(state.gate().login_path(), get(login))
        .merge(protected)
        .with_state(state.clone())
        .merge(auth_router(state.clone()))
        .layer(from_fn_with_state(state, access_gate));

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let http_server = spawn_http_server(port, app).await?;
    http_server.await??;
    Ok(())
}
