//! Range streaming proxy
//!
//! Republishes objects held by a chunked remote source as seekable, resumable
//! HTTP resources. A request is resolved against the source, its `Range` header
//! negotiated against the object size, and the selected bytes are relayed to the
//! client chunk by chunk as they arrive from upstream.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod relay;
pub mod server;
pub mod source;
