//! HTTP protocol layer module
//!
//! Protocol-level helpers shared by the file server: the isolation header
//! set, content types, cache validation, response bodies and builders.

pub mod body;
pub mod cache;
pub mod headers;
pub mod mime;
pub mod response;

// Re-export commonly used items
pub use body::ResponseBody;
pub use headers::apply_isolation_headers;
pub use response::{
    build_301_response, build_304_response, build_404_response, build_501_response,
    build_preflight_response, build_unlistable_response,
};
