//! Error taxonomy
//!
//! `SourceError` is what a [`RemoteObjectSource`](crate::source::RemoteObjectSource)
//! reports, `ProxyError` is the request-level failure that decides the response
//! status (or terminates a body that is already being sent).

use hyper::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::http::range::RangeError;
use crate::source::ObjectHandle;

/// Failure reported by a remote object source
#[derive(Debug, Error)]
pub enum SourceError {
    /// The handle does not resolve (deleted, expired or never existed)
    #[error("object not found")]
    NotFound,

    /// The upstream could not deliver the request
    #[error("upstream transport error: {0}")]
    Transport(String),

    #[error("upstream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while serving a single proxy request
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("object {0} not found")]
    ObjectNotFound(ObjectHandle),

    #[error("unsatisfiable range for object of {size} bytes: {source}")]
    InvalidRange {
        #[source]
        source: RangeError,
        size: u64,
    },

    #[error("upstream transport error for object {handle}: {source}")]
    UpstreamTransport {
        handle: ObjectHandle,
        #[source]
        source: SourceError,
    },

    #[error("upstream ended with {remaining} bytes of object {handle} still outstanding")]
    UpstreamExhausted { handle: ObjectHandle, remaining: u64 },

    #[error("upstream did not respond within {timeout:?} for object {handle}")]
    UpstreamTimeout {
        handle: ObjectHandle,
        timeout: Duration,
    },
}

impl ProxyError {
    /// Maps a source failure for `handle` into the request taxonomy.
    pub fn from_source(handle: &ObjectHandle, err: SourceError) -> Self {
        match err {
            SourceError::NotFound => Self::ObjectNotFound(handle.clone()),
            source => Self::UpstreamTransport {
                handle: handle.clone(),
                source,
            },
        }
    }

    /// Status line to use when the error occurs before the response head is sent.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::ObjectNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRange { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::UpstreamTransport { .. }
            | Self::UpstreamExhausted { .. }
            | Self::UpstreamTimeout { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> ObjectHandle {
        ObjectHandle::parse("42").unwrap()
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = ProxyError::from_source(&handle(), SourceError::NotFound);
        assert!(matches!(err, ProxyError::ObjectNotFound(_)));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn transport_maps_to_500() {
        let err = ProxyError::from_source(&handle(), SourceError::Transport("reset".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("reset"));
    }

    #[test]
    fn invalid_range_maps_to_416() {
        let err = ProxyError::InvalidRange {
            source: RangeError::MultipleRanges,
            size: 10,
        };
        assert_eq!(err.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    }
}
