//! Demo entrypoint: load config, load the classifier artifact once, serve the page.
//! A missing or unreadable artifact stops the process before anything is served.

use ids_demo::{config::DemoConfig, load_artifact, logging::StructuredLogger, router, AppState};
use tracing::info;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("IDS_DEMO_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("config.json"));
    let config = DemoConfig::load(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);

    info!(config = %config_path.display(), model = %config.model.path.display(), "IDS demo starting");

    let classifier = load_artifact(&config.model)?;
    let state = AppState::new(classifier, &config);
    let app = router(state);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("IDS demo stopped");
    Ok(())
}
