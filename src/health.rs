//! Liveness endpoint for hosting platforms that probe an HTTP port.

use anyhow::Result;
use axum::{routing::get, Router};

pub async fn serve(port: u16) -> Result<()> {
    let app = Router::new().route("/", get(|| async { "running" }));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("Liveness endpoint listening on port {port}");
    axum::serve(listener, app).await?;
    Ok(())
}
