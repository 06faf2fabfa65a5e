use axum::Router;
use std::net::SocketAddr;
use tokio::{net::TcpListener, task::JoinHandle};

pub(crate) async fn spawn_http_server(
    port: u16,
    app: Router,
) -> std::io::Result<JoinHandle<std::io::Result<()>>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on {}", addr);
    Ok(tokio::spawn(async move { axum::serve(listener, app).await }))
}
