//! Cross-origin isolation header set
//!
//! Browsers only expose `SharedArrayBuffer` to pages that are
//! cross-origin isolated. Every response leaving the server carries the
//! headers below, whatever its status.

use hyper::header::{HeaderName, HeaderValue};
use hyper::Response;

/// Header names and values, in the order they are applied
pub const ISOLATION_HEADERS: [(&str, &str); 5] = [
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-embedder-policy", "require-corp"),
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET, POST, OPTIONS"),
    ("access-control-allow-headers", "*"),
];

/// Attach the isolation headers to a response.
///
/// `insert` replaces any value the base response already set, so each header
/// ends up present exactly once.
pub fn apply_isolation_headers<B>(response: &mut Response<B>) {
    let headers = response.headers_mut();
    for (name, value) in ISOLATION_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
}
