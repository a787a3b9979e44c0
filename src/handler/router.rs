//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for method validation, route matching, and dispatching.

use hyper::header::{HeaderName, CONTENT_LENGTH, RANGE, REFERER, USER_AGENT};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, Version};
use log::{error, warn};
use percent_encoding::percent_decode_str;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppState;
use crate::handler::stream;
use crate::http::{self, Intent, ProxyBody};
use crate::logger::{self, AccessLogEntry};
use crate::source::ObjectHandle;

/// Where a request path leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Index,
    Health,
    Status,
    Object { intent: Intent, handle: ObjectHandle },
    NotFound,
}

/// Match a request path against the fixed route table
///
/// Object ids are percent-decoded before validation, a trailing slash or a
/// nested path never matches an object.
pub fn match_route(path: &str) -> Route {
    match path {
        "/" => return Route::Index,
        "/healthz" => return Route::Health,
        "/status" => return Route::Status,
        _ => {}
    }

    let Some((segment, id)) = path
        .strip_prefix('/')
        .and_then(|rest| rest.split_once('/'))
    else {
        return Route::NotFound;
    };
    let Some(intent) = Intent::from_segment(segment) else {
        return Route::NotFound;
    };
    let Ok(id) = percent_decode_str(id).decode_utf8() else {
        return Route::NotFound;
    };
    ObjectHandle::parse(&id).map_or(Route::NotFound, |handle| Route::Object { intent, handle })
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer: SocketAddr,
) -> Result<Response<ProxyBody>, Infallible> {
    let started = Instant::now();
    let (parts, _) = req.into_parts();

    let response = match parts.method {
        Method::GET | Method::HEAD => route_request(&parts, &state).await,
        _ => {
            warn!("Method not allowed: {}", parts.method);
            http::build_405_response()
        }
    };

    if state.config.logging.access_log {
        let entry = access_entry(&parts, &response, peer, started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }
    Ok(response)
}

async fn route_request(req: &Parts, state: &AppState) -> Response<ProxyBody> {
    match match_route(req.uri.path()) {
        Route::Index => http::build_index_response(),
        Route::Health => http::build_health_response(),
        Route::Status => match serde_json::to_string(&state.stats.snapshot()) {
            Ok(json) => http::build_json_response(json),
            Err(e) => {
                error!("Failed to serialize stream stats: {e}");
                http::build_500_response()
            }
        },
        Route::Object { intent, handle } => {
            // A Range value that is not visible ASCII can never parse, it is
            // passed on as an empty value so negotiation rejects it
            let range = req
                .headers
                .get(RANGE)
                .map(|value| value.to_str().unwrap_or_default());
            let is_head = req.method == Method::HEAD;
            stream::serve_object(state, handle, intent, range, is_head).await
        }
        Route::NotFound => http::build_404_response(),
    }
}

fn access_entry(
    req: &Parts,
    response: &Response<ProxyBody>,
    peer: SocketAddr,
    started: Instant,
) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer.ip().to_string(),
        req.method.to_string(),
        req.uri.path().to_string(),
    );
    entry.query = req.uri.query().map(ToString::to_string);
    entry.http_version = version_label(req.version).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    entry.range = header(RANGE);
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
