//! Request handler module
//!
//! Routes requests to the fixed endpoints and streams objects for the
//! `/download` and `/watch` routes.

pub mod router;
pub mod stream;

// Re-export main entry point
pub use router::{handle_request, match_route, Route};
