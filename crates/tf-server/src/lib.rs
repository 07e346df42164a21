//! tf-server: HTTP request intake and service bootstrap.
//!
//! This crate wires the other tf-* crates into a running service:
//!
//! - Axum router accepting download requests and pushing them onto the queue
//! - The single download/convert [`tf_pipeline::Worker`] draining that queue
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod router;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use tf_av::{ToolRegistry, YtDlpDownloader, FFMPEG, YT_DLP};
use tf_core::config::Config;
use tf_pipeline::{request_queue, BatchExecutor, Worker};

use crate::context::AppContext;

/// Start the tubeforged service.
///
/// Prepares the staging and output directories, locates ffmpeg and yt-dlp,
/// spawns the worker and serves the intake router. Returns once a shutdown
/// signal is received and the worker has finished whatever it was doing.
pub async fn start(config: Config) -> tf_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| tf_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let dirs = config.paths.absolutize()?;
    dirs.ensure()?;
    tracing::info!(
        staging = %dirs.staging_dir.display(),
        output = %dirs.output_dir.display(),
        "Using directories"
    );

    let tools = ToolRegistry::discover(&config.tools);
    for info in tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!("Tool not found: {}", info.name);
        }
    }
    let ffmpeg = tools.require(FFMPEG)?.to_path_buf();
    let yt_dlp = tools.require(YT_DLP)?.to_path_buf();

    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| tf_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    let (sender, receiver) = request_queue();

    let downloader = YtDlpDownloader::new(yt_dlp, &dirs.staging_dir, config.download.clone())
        .with_timeout(Duration::from_secs(config.tools.download_timeout_secs));
    let executor = BatchExecutor::new(ffmpeg, dirs)
        .with_timeout(Duration::from_secs(config.tools.transcode_timeout_secs));
    let worker = Worker::new(
        receiver,
        Arc::new(downloader),
        executor,
        config.conversion.clone(),
        config.download.subtitle_language.clone(),
    );

    let cancel = CancellationToken::new();
    let worker_handle = tokio::spawn(worker.run(cancel.clone()));

    let app = router::build_router(AppContext::new(sender));

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await;

    // Stop the worker even if the server died on its own.
    cancel.cancel();

    tracing::info!("Waiting for the worker to finish its current job");
    if let Err(e) = worker_handle.await {
        tracing::error!("Worker task failed: {e}");
    }

    served?;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM) or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
