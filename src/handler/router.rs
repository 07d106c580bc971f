//! Request dispatch module
//!
//! Entry point for HTTP request processing: picks a handler by method,
//! then finalizes every response with the isolation header set.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http::{self, ResponseBody};
use crate::logger::{self, AccessLogEntry};
use hyper::body::Body;
use hyper::header::{
    HeaderName, HeaderValue, CONTENT_LENGTH, IF_MODIFIED_SINCE, IF_NONE_MATCH, REFERER, SERVER,
    USER_AGENT,
};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// What the server does for a given request method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodRoute {
    /// GET or HEAD: serve from the filesystem
    Serve { is_head: bool },
    /// OPTIONS: answer the pre-flight directly
    Preflight,
    /// Anything else: 501
    Unsupported,
}

impl MethodRoute {
    pub fn for_method(method: &Method) -> Self {
        match *method {
            Method::GET => Self::Serve { is_head: false },
            Method::HEAD => Self::Serve { is_head: true },
            Method::OPTIONS => Self::Preflight,
            _ => Self::Unsupported,
        }
    }
}

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    /// Raw (still percent-encoded) request path
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_modified_since: Option<&'a str>,
    pub has_if_none_match: bool,
}

/// Main entry point for HTTP request handling
///
/// The request body is never read, so any body type is accepted.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible> {
    let started = Instant::now();
    let method = req.method();
    let uri = req.uri();

    let mut response = match MethodRoute::for_method(method) {
        MethodRoute::Preflight => http::build_preflight_response(),
        MethodRoute::Unsupported => http::build_501_response(method.as_str()),
        MethodRoute::Serve { is_head } => {
            let headers = req.headers();
            let ctx = RequestContext {
                path: uri.path(),
                query: uri.query(),
                is_head,
                if_modified_since: headers
                    .get(IF_MODIFIED_SINCE)
                    .and_then(|v| v.to_str().ok()),
                has_if_none_match: headers.contains_key(IF_NONE_MATCH),
            };
            static_files::serve_path(&ctx, &state).await
        }
    };

    finalize_response(&mut response, &state.config.http.server_name);

    if state.access_log() {
        log_access(&req, &response, peer_addr, started, &state);
    }

    Ok(response)
}

/// Last step before a response leaves the server
pub fn finalize_response<B>(response: &mut Response<B>, server_name: &str) {
    if !server_name.is_empty() {
        if let Ok(value) = HeaderValue::from_str(server_name) {
            response.headers_mut().insert(SERVER, value);
        }
    }
    http::apply_isolation_headers(response);
}

fn log_access<B>(
    req: &Request<B>,
    response: &Response<ResponseBody>,
    peer_addr: SocketAddr,
    started: Instant,
    state: &AppState,
) {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = format!("{:?}", req.version());
    entry.status = response.status().as_u16();
    entry.body_bytes = body_size(response);
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    logger::log_access(&entry, state.access_format);
}

/// Bytes the body will carry; streamed files fall back to `Content-Length`
fn body_size(response: &Response<ResponseBody>) -> u64 {
    response.body().size_hint().exact().unwrap_or_else(|| {
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::headers::ISOLATION_HEADERS;
    use http_body_util::BodyExt;
    use hyper::body::Bytes;
    use hyper::StatusCode;
    use std::path::Path;

    fn test_state(root: &Path) -> Arc<AppState> {
        let mut cfg = Config::load_from("definitely/not/here/coi_serve", None).unwrap();
        cfg.server.root = root.to_str().unwrap().to_string();
        cfg.logging.access_log = false;
        Arc::new(AppState::new(cfg).unwrap())
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log('hi');").unwrap();
        std::fs::write(dir.path().join("core.wasm"), [0x00, 0x61, 0x73, 0x6d, 0x01]).unwrap();
        std::fs::create_dir(dir.path().join("site")).unwrap();
        std::fs::write(dir.path().join("site/index.html"), "<h1>site</h1>").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/logo.svg"), "<svg/>").unwrap();
        dir
    }

    async fn send(state: &Arc<AppState>, method: Method, uri: &str) -> Response<ResponseBody> {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap();
        handle_request(req, Arc::clone(state), "127.0.0.1:5555".parse().unwrap())
            .await
            .unwrap()
    }

    async fn body_of(resp: Response<ResponseBody>) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    fn assert_isolation_headers<B>(resp: &Response<B>) {
        for (name, value) in ISOLATION_HEADERS {
            let values: Vec<_> = resp.headers().get_all(name).iter().collect();
            assert_eq!(values, vec![value], "header {name} on {}", resp.status());
        }
    }

    #[test]
    fn test_method_table() {
        assert_eq!(
            MethodRoute::for_method(&Method::GET),
            MethodRoute::Serve { is_head: false }
        );
        assert_eq!(
            MethodRoute::for_method(&Method::HEAD),
            MethodRoute::Serve { is_head: true }
        );
        assert_eq!(MethodRoute::for_method(&Method::OPTIONS), MethodRoute::Preflight);
        assert_eq!(MethodRoute::for_method(&Method::POST), MethodRoute::Unsupported);
        assert_eq!(MethodRoute::for_method(&Method::DELETE), MethodRoute::Unsupported);
    }

    #[tokio::test]
    async fn test_get_file_exact_bytes() {
        let dir = fixture();
        let state = test_state(dir.path());

        let resp = send(&state, Method::GET, "/core.wasm").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "application/wasm");
        assert!(resp.headers().contains_key("last-modified"));
        assert_isolation_headers(&resp);
        assert_eq!(body_of(resp).await.as_ref(), &[0x00, 0x61, 0x73, 0x6d, 0x01]);
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let dir = fixture();
        let state = test_state(dir.path());

        let resp = send(&state, Method::HEAD, "/app.js").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-length"], "18");
        assert_isolation_headers(&resp);
        assert!(body_of(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_404() {
        let dir = fixture();
        let state = test_state(dir.path());

        let resp = send(&state, Method::GET, "/nope.js").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_isolation_headers(&resp);
    }

    #[tokio::test]
    async fn test_options_any_path() {
        let dir = fixture();
        let state = test_state(dir.path());

        for path in ["/", "/core.wasm", "/does/not/exist"] {
            let resp = send(&state, Method::OPTIONS, path).await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert_isolation_headers(&resp);
            assert!(body_of(resp).await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_unsupported_method_501() {
        let dir = fixture();
        let state = test_state(dir.path());

        let resp = send(&state, Method::POST, "/app.js").await;
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
        assert_isolation_headers(&resp);
    }

    #[tokio::test]
    async fn test_directory_index_served() {
        let dir = fixture();
        let state = test_state(dir.path());

        let resp = send(&state, Method::GET, "/site/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "text/html; charset=utf-8");
        assert_isolation_headers(&resp);
        assert_eq!(body_of(resp).await, Bytes::from("<h1>site</h1>"));
    }

    #[tokio::test]
    async fn test_directory_listing_generated() {
        let dir = fixture();
        let state = test_state(dir.path());

        let resp = send(&state, Method::GET, "/assets/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_isolation_headers(&resp);
        let body = String::from_utf8(body_of(resp).await.to_vec()).unwrap();
        assert!(body.contains("Directory listing for /assets/"));
        assert!(body.contains("<a href=\"logo.svg\">logo.svg</a>"));
    }

    #[tokio::test]
    async fn test_directory_listing_disabled() {
        let dir = fixture();
        let mut cfg = Config::load_from("definitely/not/here/coi_serve", None).unwrap();
        cfg.server.root = dir.path().to_str().unwrap().to_string();
        cfg.http.directory_listing = false;
        let state = Arc::new(AppState::new(cfg).unwrap());

        let resp = send(&state, Method::GET, "/assets/").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        // Index files still win
        let resp = send(&state, Method::GET, "/site/").await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_directory_redirect_keeps_query() {
        let dir = fixture();
        let state = test_state(dir.path());

        let resp = send(&state, Method::GET, "/site?lang=en").await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()["location"], "/site/?lang=en");
        assert_isolation_headers(&resp);
    }

    #[tokio::test]
    async fn test_missing_backslash_name_404() {
        let dir = fixture();
        let state = test_state(dir.path());

        for uri in ["/no%5Csuch.txt", "/no%5Csuch.txt/", "/site/%5C"] {
            let resp = send(&state, Method::GET, uri).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
            assert_isolation_headers(&resp);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_backslash_file_name_served() {
        let dir = fixture();
        std::fs::write(dir.path().join("a\\b.txt"), "backslash").unwrap();
        let state = test_state(dir.path());

        let resp = send(&state, Method::GET, "/a%5Cb.txt").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_of(resp).await, Bytes::from("backslash"));
    }

    #[tokio::test]
    async fn test_large_file_streamed_whole() {
        let dir = fixture();
        let data: Vec<u8> = (0..http::body::CHUNK_SIZE * 3 + 7)
            .map(|i| u8::try_from(i % 256).unwrap())
            .collect();
        std::fs::write(dir.path().join("ffmpeg-core.wasm"), &data).unwrap();
        let state = test_state(dir.path());

        let resp = send(&state, Method::GET, "/ffmpeg-core.wasm").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "application/wasm");
        assert_eq!(resp.headers()["content-length"], data.len().to_string().as_str());
        assert_eq!(body_size(&resp), data.len() as u64);
        assert_isolation_headers(&resp);
        assert_eq!(body_of(resp).await.as_ref(), data.as_slice());
    }

    #[tokio::test]
    async fn test_file_with_trailing_slash_404() {
        let dir = fixture();
        let state = test_state(dir.path());

        let resp = send(&state, Method::GET, "/app.js/").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_traversal_stays_in_root() {
        let outer = tempfile::tempdir().unwrap();
        std::fs::write(outer.path().join("secret.txt"), "secret").unwrap();
        let root = outer.path().join("public");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("secret.txt"), "public copy").unwrap();
        let state = test_state(&root);

        for uri in ["/../secret.txt", "/%2e%2e/secret.txt", "/a/%2E%2E/%2e%2e/secret.txt"] {
            let resp = send(&state, Method::GET, uri).await;
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
            assert_eq!(body_of(resp).await, Bytes::from("public copy"), "{uri}");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_blocked() {
        let outer = tempfile::tempdir().unwrap();
        std::fs::write(outer.path().join("secret.txt"), "secret").unwrap();
        let root = outer.path().join("public");
        std::fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(outer.path().join("secret.txt"), root.join("leak.txt"))
            .unwrap();
        let state = test_state(&root);

        let resp = send(&state, Method::GET, "/leak.txt").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_isolation_headers(&resp);
    }

    #[tokio::test]
    async fn test_if_modified_since_304() {
        let dir = fixture();
        let state = test_state(dir.path());

        let first = send(&state, Method::GET, "/app.js").await;
        let last_modified = first.headers()["last-modified"].clone();

        let req = Request::builder()
            .uri("/app.js")
            .header(IF_MODIFIED_SINCE, last_modified.clone())
            .body(())
            .unwrap();
        let resp = handle_request(req, Arc::clone(&state), "127.0.0.1:5555".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
        assert_isolation_headers(&resp);

        // If-None-Match disables the date check
        let req = Request::builder()
            .uri("/app.js")
            .header(IF_MODIFIED_SINCE, last_modified)
            .header(IF_NONE_MATCH, "\"abc\"")
            .body(())
            .unwrap();
        let resp = handle_request(req, Arc::clone(&state), "127.0.0.1:5555".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_server_header() {
        let dir = fixture();
        let state = test_state(dir.path());

        let resp = send(&state, Method::GET, "/app.js").await;
        assert!(resp.headers()["server"]
            .to_str()
            .unwrap()
            .starts_with("coi_serve/"));
    }
}
