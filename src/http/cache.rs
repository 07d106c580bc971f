//! HTTP cache validation module
//!
//! Provides `Last-Modified` formatting and `If-Modified-Since` handling.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::time::SystemTime;

/// IMF-fixdate layout, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a timestamp as an HTTP date
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE_FORMAT).to_string()
}

/// Obsolete layouts clients may still send: RFC 850 and asctime
const OBSOLETE_DATE_FORMATS: [&str; 2] = ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"];

/// Parse an HTTP date in any of its three layouts, returning `None` for
/// anything malformed
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    OBSOLETE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Decide whether a conditional GET can be answered with 304
///
/// `If-None-Match` takes precedence over `If-Modified-Since`; since no
/// entity tags are generated here, its presence simply disables the check.
/// File times are compared at one-second resolution, the precision of the
/// header itself.
pub fn is_not_modified(
    if_modified_since: Option<&str>,
    has_if_none_match: bool,
    modified: SystemTime,
) -> bool {
    if has_if_none_match {
        return false;
    }

    let Some(since) = if_modified_since.and_then(parse_http_date) else {
        return false;
    };

    DateTime::<Utc>::from(modified).timestamp() <= since.timestamp()
}
