//! Logger module
//!
//! Diagnostics go through the `log` facade and are printed by `env_logger`.
//! Access log lines are formatted here and emitted under the `access` target so
//! they can be filtered separately (`RUST_LOG=access=off`).

mod format;

pub use format::AccessLogEntry;

use log::info;
use std::net::SocketAddr;

use crate::config::{Config, LoggingConfig};

/// Initialize the logger with configuration
///
/// `RUST_LOG` takes precedence over the configured level. Should be called once
/// at application startup.
pub fn init(config: &LoggingConfig) -> Result<(), log::SetLoggerError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.level))
        .format_timestamp_millis()
        .try_init()
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    info!(target: "access", "{}", entry.format(format));
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    info!("Stream server listening on http://{addr}");
    info!("Log level: {}", config.logging.level);
    if let Some(workers) = config.server.workers {
        info!("Worker threads: {workers}");
    }
    info!(
        "Chunk size: {} bytes, upstream timeout: {}s",
        config.stream.chunk_size, config.stream.upstream_timeout
    );
    info!("Object source: {:?}", config.source);
    if let Some(max) = config.performance.max_connections {
        info!("Max connections: {max}");
    }
}
