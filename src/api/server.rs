use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::{
    services::{download_videos, health},
    state::AppState,
};
use crate::config::Config;
use crate::retrieval::{Retriever, YtDlpRetriever};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// HTTP routes over the given state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/download", post(download_videos))
        .route("/health", get(health))
        .with_state(state)
        // Handles Content-Encoding of request bodies (gzip)
        .layer(RequestDecompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Serve until Ctrl+C or SIGTERM
pub async fn run(config: Config, address: SocketAddr) -> Result<(), AnyError> {
    let retriever = YtDlpRetriever::from_config(&config.retrieval)
        .map_err(|e| format!("Failed to set up retriever: {e}"))?;
    info!(binary = %retriever.binary().display(), "Using yt-dlp");

    let retriever: Arc<dyn Retriever> = Arc::new(retriever);
    if !retriever.is_available() {
        warn!("yt-dlp binary is not executable; downloads will fail");
    }

    let state = AppState::new(config, retriever);
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "vidbundle API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
