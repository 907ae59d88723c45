use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use learnhub_core::SystemClock;
use learnhub_infra::{AuthConfig, ServerConfig, spawn_session_sweeper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    learnhub_observability::init();

    let auth = AuthConfig::from_env().context("invalid auth configuration")?;
    let server = ServerConfig::from_env().context("invalid server configuration")?;

    let services = learnhub_api::app::build_services(&auth, &server.storage, Arc::new(SystemClock))
        .await
        .context("failed to build services")?;
    let services = Arc::new(services);

    let sweeper = auth.sweep_interval.map(|interval| {
        spawn_session_sweeper(services.sessions.clone(), services.clock.clone(), interval)
    });

    let app = learnhub_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", server.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
