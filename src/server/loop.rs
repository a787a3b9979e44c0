// Server loop module
// Accepts connections until shutdown, then drains in-flight responses

use hyper_util::server::graceful::GracefulShutdown;
use log::{error, info, warn};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;

/// How long open connections may keep streaming after shutdown was requested
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Serve connections from `listener` until `shutdown` resolves.
///
/// Once `shutdown` fires the listener is closed, idle keep-alive connections
/// are closed, and responses already streaming get up to [`SHUTDOWN_GRACE`]
/// to finish.
pub async fn run(listener: TcpListener, state: Arc<AppState>, shutdown: impl Future<Output = ()>) {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let graceful = GracefulShutdown::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections, &graceful);
                    }
                    Err(e) => error!("Failed to accept connection: {e}"),
                }
            }

            () = &mut shutdown => {
                info!("No longer accepting connections");
                break;
            }
        }
    }
    drop(listener);

    let open = active_connections.load(Ordering::SeqCst);
    if open > 0 {
        info!("Waiting for {open} open connections to finish");
    }
    tokio::select! {
        () = graceful.shutdown() => info!("All connections closed"),
        () = tokio::time::sleep(SHUTDOWN_GRACE) => {
            warn!(
                "Grace period of {}s elapsed, dropping {} connections",
                SHUTDOWN_GRACE.as_secs(),
                active_connections.load(Ordering::SeqCst)
            );
        }
    }
}
