//! HTTP response building module
//!
//! Provides the body type shared by all responses and builders for the fixed
//! status responses. Streamed object responses are shaped in
//! [`crate::handler::stream`].

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::header::{ACCEPT_RANGES, ALLOW, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use log::error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body of every response: either a fixed buffer or a relayed stream
pub type ProxyBody = UnsyncBoxBody<Bytes, BoxError>;

pub fn full_body(data: impl Into<Bytes>) -> ProxyBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn empty_body() -> ProxyBody {
    Empty::new().map_err(|never| match never {}).boxed_unsync()
}

/// Build a plain text response
pub fn build_text_response(status: StatusCode, text: &'static str) -> Response<ProxyBody> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONTENT_LENGTH, text.len())
        .body(full_body(text))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            Response::new(empty_body())
        })
}

/// Build the banner served on `/`
pub fn build_index_response() -> Response<ProxyBody> {
    build_text_response(StatusCode::OK, "Stream server is online")
}

/// Build liveness probe response
pub fn build_health_response() -> Response<ProxyBody> {
    build_text_response(StatusCode::OK, "ok")
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<ProxyBody> {
    build_text_response(StatusCode::NOT_FOUND, "File Not Found")
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<ProxyBody> {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(ALLOW, "GET, HEAD")
        .body(full_body("405 Method Not Allowed"))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::METHOD_NOT_ALLOWED, &e);
            Response::new(empty_body())
        })
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(size: u64) -> Response<ProxyBody> {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONTENT_RANGE, format!("bytes */{size}"))
        .header(ACCEPT_RANGES, "bytes")
        .body(full_body("Range Not Satisfiable"))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::RANGE_NOT_SATISFIABLE, &e);
            Response::new(empty_body())
        })
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<ProxyBody> {
    build_text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

/// Build JSON response
pub fn build_json_response(json: String) -> Response<ProxyBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/json")
        .header(CONTENT_LENGTH, json.len())
        .body(full_body(json))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::OK, &e);
            Response::new(empty_body())
        })
}

/// Log response build error
pub(crate) fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    error!("Failed to build {status} response: {error}");
}
