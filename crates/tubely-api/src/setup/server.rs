//! Server startup and graceful shutdown

use anyhow::Result;
use axum::Router;
use tubely_core::Config;

/// Start the server with graceful shutdown
pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port());
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        max_video_mb = config.ingest.max_video_size_bytes / 1024 / 1024,
        max_thumbnail_mb = config.ingest.max_thumbnail_size_bytes / 1024 / 1024,
        video_types = %config.ingest.video_allowed_content_types.join(","),
        thumbnail_types = %config.ingest.thumbnail_allowed_content_types.join(","),
        ffmpeg_path = %config.ingest.ffmpeg_path,
        ffprobe_path = %config.ingest.ffprobe_path,
        staging_dir = %config.ingest.staging_dir.display(),
        storage_backend = %config.storage.backend,
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves on Ctrl+C (SIGINT) or SIGTERM. A handler that cannot be
/// installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
