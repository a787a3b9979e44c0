//! Object streaming handler
//!
//! `Received → MetadataResolved → RangeValidated → Streaming`. Failures up to
//! range validation still shape the response, failures while streaming can
//! only cut the body short.

use hyper::header::{
    ACCEPT_RANGES, CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE,
    CONTENT_TYPE,
};
use hyper::Response;
use log::{debug, error, info};
use std::sync::Arc;

use crate::config::{AppState, StreamConfig};
use crate::error::ProxyError;
use crate::http::response::log_build_error;
use crate::http::{self, content_disposition, empty_body, negotiate, Intent, Negotiated, ProxyBody};
use crate::relay;
use crate::source::{ObjectHandle, ObjectMetadata};

/// Serve `handle` with the given intent. `GET` relays the negotiated range,
/// `HEAD` stops after the headers.
pub async fn serve_object(
    state: &AppState,
    handle: ObjectHandle,
    intent: Intent,
    range_header: Option<&str>,
    is_head: bool,
) -> Response<ProxyBody> {
    match stream_object(state, handle, intent, range_header, is_head).await {
        Ok(response) => response,
        Err(err) => error_response(&err),
    }
}

async fn stream_object(
    state: &AppState,
    handle: ObjectHandle,
    intent: Intent,
    range_header: Option<&str>,
    is_head: bool,
) -> Result<Response<ProxyBody>, ProxyError> {
    let meta = relay::resolve(state.source.as_ref(), &handle, state.relay).await?;
    let negotiated = negotiate(range_header, meta.size).map_err(|source| {
        ProxyError::InvalidRange {
            source,
            size: meta.size,
        }
    })?;
    debug!("object {handle}: {} bytes, serving {negotiated:?}", meta.size);

    let Some(head) = build_stream_head(&negotiated, &meta, intent, &state.config.stream) else {
        return Ok(http::build_500_response());
    };

    let body = match negotiated.range() {
        Some(range) if !is_head => relay::open_session(
            state.source.as_ref(),
            handle,
            range,
            state.relay,
            Arc::clone(&state.stats),
        )
        .await?
        .into_body(),
        _ => empty_body(),
    };

    Ok(head.map(|()| body))
}

/// Response head for a successfully negotiated object, `None` if the metadata
/// cannot be expressed as header values.
fn build_stream_head(
    negotiated: &Negotiated,
    meta: &ObjectMetadata,
    intent: Intent,
    conf: &StreamConfig,
) -> Option<Response<()>> {
    let name = meta
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(&conf.default_name);
    let content_type = meta
        .content_type
        .as_deref()
        .filter(|content_type| !content_type.is_empty())
        .unwrap_or(&conf.default_content_type);

    let mut builder = Response::builder()
        .status(negotiated.status())
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, negotiated.content_length())
        .header(ACCEPT_RANGES, "bytes")
        .header(CONTENT_DISPOSITION, content_disposition(intent, name))
        .header(CACHE_CONTROL, conf.cache_control.as_str());
    if let Some(content_range) = negotiated.content_range() {
        builder = builder.header(CONTENT_RANGE, content_range);
    }

    match builder.body(()) {
        Ok(head) => Some(head),
        Err(e) => {
            log_build_error(negotiated.status(), &e);
            None
        }
    }
}

/// Response for a failure that happened before any byte was sent
fn error_response(err: &ProxyError) -> Response<ProxyBody> {
    let status = err.status();
    if status.is_server_error() {
        error!("{err}");
    } else {
        info!("{err}");
    }

    match err {
        ProxyError::ObjectNotFound(_) => http::build_404_response(),
        ProxyError::InvalidRange { size, .. } => http::build_416_response(*size),
        ProxyError::UpstreamTransport { .. }
        | ProxyError::UpstreamExhausted { .. }
        | ProxyError::UpstreamTimeout { .. } => http::build_500_response(),
    }
}
