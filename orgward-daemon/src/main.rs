//! Orgward daemon — local development wiring.
//!
//! Serves the webhook receiver and runs the event worker against the
//! in-process queue and forge fixture. Production deployments provide the
//! forge, queue, and secret-store adapters behind the port contracts; the
//! `WEBHOOK_SECRET` variable stands in for the secret store here.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::info;

use orgward_daemon::{router, run_worker, AppState, DaemonConfig, InMemoryQueue};
use orgward_engine::{Config, Platform};
use orgward_forge::mock::InMemoryForge;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let daemon_config = DaemonConfig::from_env()?;

    let config = Config {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        metrics_interval: daemon_config.metrics_interval,
        audit_bucket: daemon_config.audit_bucket.clone(),
        queue_url: daemon_config.queue_url.clone(),
        webhook_secret: std::env::var("WEBHOOK_SECRET")
            .unwrap_or_else(|_| "local-development-secret".to_string()),
    };

    let forge = Arc::new(InMemoryForge::new("local"));
    let platform = Arc::new(Platform::new(config, forge));
    let queue = Arc::new(InMemoryQueue::new());

    let state = AppState {
        platform: platform.clone(),
        queue: queue.clone(),
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let worker_handle = {
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(run_worker(platform, queue, shutdown_rx))
    };

    let app = router(state).layer(TraceLayer::new_for_http());
    let addr = SocketAddr::from(([0, 0, 0, 0], daemon_config.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, "daemon listening");
    info!("health check available at /health, webhook receiver at /hook");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(());
    worker_handle.await??;

    info!("daemon shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, starting graceful shutdown"),
        _ = terminate => info!("received terminate signal, starting graceful shutdown"),
    }
}
