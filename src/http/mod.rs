//! HTTP protocol layer module
//!
//! Range negotiation, header construction and response builders, decoupled
//! from where the bytes come from.

pub mod disposition;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use disposition::{content_disposition, Intent};
pub use range::{negotiate, ByteRange, Negotiated, RangeError};
pub use response::{
    build_404_response, build_405_response, build_416_response, build_500_response,
    build_health_response, build_index_response, build_json_response, empty_body, full_body,
    BoxError, ProxyBody,
};
