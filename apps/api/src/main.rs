//! # Receipt Processor
//!
//! Process entry point: HTTP server, worker pool, or both.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ApiConfig::load()          ← PORT, BIND_ADDR, RECEIPT_ROLE            │
//! │  PipelineConfig::load()     ← RECEIPT_CONFIG file + env overrides      │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  Backends::connect()        ← memory, or Redis (ping on connect)       │
//! │        │                                                                │
//! │        ├── role runs workers ──► WorkerPool::spawn                     │
//! │        └── role serves http  ──► axum::serve(router)                   │
//! │                                                                         │
//! │  Ctrl+C / SIGTERM ──► stop HTTP ──► WorkerPool::shutdown               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Context;
use receipt_api::{router, ApiConfig};
use receipt_pipeline::{Backends, PipelineConfig, SubmissionPipeline, WorkerPool};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting receipt processor...");

    // Load configuration
    let config = ApiConfig::load().context("invalid API configuration")?;
    let pipeline_config = PipelineConfig::load(config.pipeline_config.clone())
        .context("invalid pipeline configuration")?;
    config.check_backend(&pipeline_config)?;

    info!(
        role = %config.role,
        backend = %pipeline_config.broker.backend,
        queue = %pipeline_config.queue.name,
        workers = pipeline_config.worker.count,
        "Configuration loaded"
    );

    // Connect queue and store
    let backends = Backends::connect(&pipeline_config)
        .await
        .context("failed to open queue and store")?;

    let pool = config
        .role
        .runs_workers()
        .then(|| WorkerPool::spawn(&backends, &pipeline_config.worker));

    if config.role.serves_http() {
        let addr = config.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind to {addr}"))?;
        info!(%addr, "HTTP server listening");

        let app = router(SubmissionPipeline::from_backends(&backends));
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server failed")?;
    } else {
        shutdown_signal().await;
    }

    if let Some(pool) = pool {
        pool.shutdown().await;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(?e, "Failed to install Ctrl+C handler");
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
                error!(?e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
