//! Chunk relay engine
//!
//! Pulls a byte range from a [`RemoteObjectSource`] chunk by chunk and hands
//! each chunk to the response body as soon as it arrives. Memory use per stream
//! is bounded by the chunk size: no chunk is requested before the transport
//! accepted the previous one.

mod session;
mod stats;

use std::sync::Arc;
use std::time::Duration;

use crate::config::StreamConfig;
use crate::error::ProxyError;
use crate::http::ByteRange;
use crate::source::{ObjectHandle, ObjectMetadata, RemoteObjectSource};

pub use session::StreamSession;
pub use stats::{StatsSnapshot, StreamStats};

/// Tunables of the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySettings {
    /// Upper bound of a single upstream chunk
    pub chunk_size: usize,
    /// Upper bound for any single upstream call, including each chunk
    pub upstream_timeout: Duration,
}

impl From<&StreamConfig> for RelaySettings {
    fn from(conf: &StreamConfig) -> Self {
        Self {
            chunk_size: conf.chunk_size,
            upstream_timeout: Duration::from_secs(conf.upstream_timeout),
        }
    }
}

/// Look up current metadata for `handle`, bounded by the upstream timeout.
pub async fn resolve(
    source: &dyn RemoteObjectSource,
    handle: &ObjectHandle,
    settings: RelaySettings,
) -> Result<ObjectMetadata, ProxyError> {
    match tokio::time::timeout(settings.upstream_timeout, source.resolve(handle)).await {
        Ok(result) => result.map_err(|err| ProxyError::from_source(handle, err)),
        Err(_) => Err(ProxyError::UpstreamTimeout {
            handle: handle.clone(),
            timeout: settings.upstream_timeout,
        }),
    }
}

/// Open the upstream read for `range` and wrap it in a session.
pub async fn open_session(
    source: &dyn RemoteObjectSource,
    handle: ObjectHandle,
    range: ByteRange,
    settings: RelaySettings,
    stats: Arc<StreamStats>,
) -> Result<StreamSession, ProxyError> {
    let read = source.read_chunks(
        &handle,
        range.start,
        range.content_length(),
        settings.chunk_size,
    );
    let chunks = match tokio::time::timeout(settings.upstream_timeout, read).await {
        Ok(result) => result.map_err(|err| ProxyError::from_source(&handle, err))?,
        Err(_) => {
            return Err(ProxyError::UpstreamTimeout {
                handle,
                timeout: settings.upstream_timeout,
            })
        }
    };

    Ok(StreamSession::new(
        handle,
        range,
        chunks,
        settings.upstream_timeout,
        stats,
    ))
}
