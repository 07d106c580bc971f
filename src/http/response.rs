//! HTTP response building module
//!
//! Builders for every status the file server produces. None of them panic:
//! a builder error is logged and a bare fallback response returned.

use super::body::{self, ResponseBody};
use hyper::{Response, StatusCode};

/// Build pre-flight (OPTIONS) response: 200 with an empty body
pub fn build_preflight_response() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Length", 0)
        .body(body::empty())
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            Response::new(body::empty())
        })
}

/// Build 301 redirect, used to add the trailing slash to directory URLs
pub fn build_301_response(location: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header("Location", location)
        .header("Content-Length", 0)
        .body(body::empty())
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            fallback(StatusCode::MOVED_PERMANENTLY, "")
        })
}

/// Build 304 Not Modified response
pub fn build_304_response(last_modified: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header("Last-Modified", last_modified)
        .body(body::empty())
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            fallback(StatusCode::NOT_MODIFIED, "")
        })
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<ResponseBody> {
    build_text_response(StatusCode::NOT_FOUND, "404 Not Found".to_string())
}

/// Build 404 for a directory that exists but cannot be read
pub fn build_unlistable_response() -> Response<ResponseBody> {
    build_text_response(
        StatusCode::NOT_FOUND,
        "404 No permission to list directory".to_string(),
    )
}

/// Build 501 Not Implemented response for methods the server does not handle
pub fn build_501_response(method: &str) -> Response<ResponseBody> {
    build_text_response(
        StatusCode::NOT_IMPLEMENTED,
        format!("501 Unsupported method ('{method}')"),
    )
}

/// Build generic HTML response
pub fn build_html_response(content: String, is_head: bool) -> Response<ResponseBody> {
    let content_length = content.len();
    let body = if is_head {
        body::empty()
    } else {
        body::full(content)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/html; charset=utf-8")
        .header("Content-Length", content_length)
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            fallback(StatusCode::INTERNAL_SERVER_ERROR, "")
        })
}

/// Build 200 response for a file
///
/// `body` is either the file stream or, for HEAD, an empty body; the
/// advertised length is the file size in both cases.
pub fn build_file_response(
    body: ResponseBody,
    content_length: u64,
    content_type: &str,
    last_modified: Option<&str>,
) -> Response<ResponseBody> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length);
    if let Some(date) = last_modified {
        builder = builder.header("Last-Modified", date);
    }

    builder.body(body).unwrap_or_else(|e| {
        log_build_error("200", &e);
        fallback(StatusCode::INTERNAL_SERVER_ERROR, "")
    })
}

fn build_text_response(status: StatusCode, message: String) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Length", message.len())
        .body(body::full(message))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            fallback(status, status.canonical_reason().unwrap_or_default())
        })
}

fn fallback(status: StatusCode, message: &'static str) -> Response<ResponseBody> {
    let mut resp = Response::new(body::full(message));
    *resp.status_mut() = status;
    resp
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
