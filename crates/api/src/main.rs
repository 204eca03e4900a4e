use std::sync::Arc;

use anyhow::Context;

use classifieds_api::app::{build_app, services::build_services};
use classifieds_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    classifieds_observability::init();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    let services = Arc::new(
        build_services(&config)
            .await
            .context("failed to initialize services")?,
    );

    let app = build_app(services.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    services.shutdown().await;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
