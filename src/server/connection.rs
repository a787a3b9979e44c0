// Connection handling module
// Serves a single accepted TCP connection with hyper's HTTP/1.1 stack

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use log::{debug, warn};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppState;
use crate::handler;

/// Accept a connection, enforcing the connection limit, and serve it in a
/// spawned task.
///
/// The connection is registered with `graceful` so shutdown can wait for
/// in-flight responses. `conn_counter` tracks open connections.
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    graceful: &GracefulShutdown,
) {
    // Increment first, then check, so concurrent accepts cannot both slip in
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);
    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            warn!("Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected.");
            drop(stream);
            return;
        }
    }
    debug!("Accepted connection from {peer_addr}");

    let perf = &state.config.performance;
    let mut builder = http1::Builder::new();
    builder
        .keep_alive(perf.keep_alive)
        .timer(TokioTimer::new())
        .header_read_timeout(Duration::from_secs(perf.header_read_timeout));

    let service_state = Arc::clone(state);
    let conn = builder.serve_connection(
        TokioIo::new(stream),
        service_fn(move |req| {
            handler::handle_request(req, Arc::clone(&service_state), peer_addr)
        }),
    );
    let conn = graceful.watch(conn);

    let conn_counter = Arc::clone(conn_counter);
    tokio::spawn(async move {
        // Response bodies end here too, an error mostly means the client went away
        if let Err(err) = conn.await {
            debug!("Connection from {peer_addr} closed with error: {err}");
        }
        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}
