//! HTTP server startup with graceful shutdown.

mod shutdown;

use std::io;
use std::net::SocketAddr;
use std::time::Instant;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use self::shutdown::shutdown_signal;
use crate::config::ServerConfig;
use crate::{TRACING_TARGET_SERVER_SHUTDOWN, TRACING_TARGET_SERVER_STARTUP};

/// Binds to the configured address and serves `app` until a shutdown signal.
///
/// Once the signal arrives, the server stops accepting connections and
/// `cancel` fires after the configured grace period, aborting any payload
/// work still in flight.
///
/// # Errors
///
/// Returns an error if:
/// - Cannot bind to the specified address/port
/// - Server encounters a fatal error during operation
pub async fn serve(app: Router, config: ServerConfig, cancel: CancellationToken) -> io::Result<()> {
    let server_addr = config.server_addr();

    if config.binds_to_all_interfaces() {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            addr = %server_addr,
            "Upload endpoints are reachable from every network interface"
        );
    }

    let listener = TcpListener::bind(server_addr).await.inspect_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_SERVER_STARTUP,
            addr = %server_addr,
            error = %err,
            hint = bind_hint(err).unwrap_or("none"),
            "Failed to bind to address"
        );
    })?;

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        addr = %server_addr,
        "Server is ready and listening for connections"
    );

    let started = Instant::now();
    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(config.shutdown_timeout(), cancel))
    .await;

    let uptime_secs = started.elapsed().as_secs();
    match &result {
        Ok(()) => tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            uptime_secs,
            "Server stopped"
        ),
        Err(err) => tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %err,
            kind = ?err.kind(),
            uptime_secs,
            "Server stopped unexpectedly"
        ),
    }

    result
}

/// Explains the usual cause of a failed bind.
fn bind_hint(err: &io::Error) -> Option<&'static str> {
    match err.kind() {
        io::ErrorKind::AddrInUse => Some("another process holds this port; set PORT to a free one"),
        io::ErrorKind::PermissionDenied => Some("ports below 1024 need elevated privileges"),
        io::ErrorKind::AddrNotAvailable => Some("HOST is not assigned to any local interface"),
        _ => None,
    }
}
