use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use manual_rag::core::config::{AppConfig, AppPaths};
use manual_rag::core::logging;
use manual_rag::server;
use manual_rag::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    let paths = AppPaths::new(&config.paths);
    logging::init(&paths.log_dir);

    tracing::info!("Project root: {}", paths.project_root.display());
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::initialize(config, paths)
        .await
        .context("Failed to initialize application state")?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!(
        "Listening on http://{} ({} chunks, {} images)",
        addr,
        state.retriever().text_count(),
        state.retriever().image_count()
    );

    let app: Router = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
