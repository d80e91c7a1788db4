//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::service::SpotService;

use super::routes::routes;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// If true, ignore SIGTERM and wait for explicit /shutdown or SIGINT.
    pub await_explicit_shutdown: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            await_explicit_shutdown: false,
        }
    }
}

/// Start the HTTP server, announce, and serve until a shutdown signal.
///
/// The startup announcement runs in the background so a slow webhook never holds up
/// accepting connections. On shutdown, queued outcome lines are flushed before the
/// offline announcement.
pub async fn serve(config: ServerConfig, service: Arc<SpotService>) -> anyhow::Result<()> {
    let shutdown_rx = service.shutdown_rx();
    let app = routes(Arc::clone(&service));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!(
        spots = service.config().num_spots(),
        "Starting spotq server on {}", actual_addr
    );

    let online = tokio::spawn({
        let service = Arc::clone(&service);
        async move {
            if let Err(e) = service.announce_online().await {
                warn!(error = %e, "Could not send startup message");
            }
        }
    });

    let await_explicit_shutdown = config.await_explicit_shutdown;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let reason = wait_for_stop(await_explicit_shutdown, shutdown_rx).await;
            info!(?reason, "Stopping spotq server");
        })
        .await?;

    // Offline must not overtake a still-retrying online message.
    if !online.is_finished() {
        online.abort();
    }

    info!("Server shutdown complete");

    service.announce_offline().await;

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Interrupt,
    Terminate,
    Requested,
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for SIGINT");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "Could not listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Resolve on SIGINT, SIGTERM (unless only explicit stops count), or `POST /shutdown`.
async fn wait_for_stop(
    await_explicit_shutdown: bool,
    mut shutdown_rx: watch::Receiver<bool>,
) -> StopReason {
    let sigterm = async {
        if await_explicit_shutdown {
            info!("await_explicit_shutdown enabled, ignoring SIGTERM");
            std::future::pending::<()>().await;
        }
        terminate().await;
    };

    let requested = async {
        let requested = shutdown_rx.wait_for(|stop| *stop).await.is_ok();
        // A dropped sender can never request a stop.
        if !requested {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = interrupt() => StopReason::Interrupt,
        _ = sigterm => StopReason::Terminate,
        _ = requested => StopReason::Requested,
    }
}
