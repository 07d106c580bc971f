//! Static file serving module
//!
//! Maps request paths onto the serving root and builds file, index,
//! listing, redirect and not-found responses.

use crate::config::AppState;
use crate::handler::listing;
use crate::handler::router::RequestContext;
use crate::http::{self, body, cache, mime, ResponseBody};
use crate::logger;
use hyper::Response;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Serve a GET/HEAD request from the serving root
pub async fn serve_path(ctx: &RequestContext<'_>, state: &AppState) -> Response<ResponseBody> {
    let decoded = decode_path(ctx.path);
    let Some(relative) = relative_path(&decoded) else {
        return http::build_404_response();
    };
    let target = state.root.join(relative);

    let Some(canonical) = within_root(&target, &state.root, ctx.path).await else {
        return http::build_404_response();
    };

    // File not found is common (404), no need to log at warning level
    let Ok(metadata) = fs::metadata(&canonical).await else {
        return http::build_404_response();
    };

    if metadata.is_dir() {
        return serve_directory(ctx, state, &canonical, &decoded).await;
    }

    // "/file.txt/" names a directory that does not exist
    if ctx.path.ends_with('/') {
        return http::build_404_response();
    }

    serve_file(ctx, &canonical).await
}

async fn serve_directory(
    ctx: &RequestContext<'_>,
    state: &AppState,
    dir: &Path,
    display_path: &str,
) -> Response<ResponseBody> {
    // Relative links in the page only resolve against a URL ending in '/'
    if !ctx.path.ends_with('/') {
        let location = match ctx.query {
            Some(q) => format!("{}/?{q}", ctx.path),
            None => format!("{}/", ctx.path),
        };
        return http::build_301_response(&location);
    }

    for index_file in &state.config.http.index_files {
        let candidate = dir.join(index_file);
        let Some(index_path) = within_root(&candidate, &state.root, ctx.path).await else {
            continue;
        };
        if fs::metadata(&index_path).await.is_ok_and(|m| m.is_file()) {
            return serve_file(ctx, &index_path).await;
        }
    }

    if !state.config.http.directory_listing {
        return http::build_404_response();
    }

    match listing::render_listing(dir, display_path).await {
        Ok(html) => http::response::build_html_response(html, ctx.is_head),
        Err(e) => {
            logger::log_warning(&format!(
                "Cannot list directory '{}': {e}",
                dir.display()
            ));
            http::build_unlistable_response()
        }
    }
}

async fn serve_file(ctx: &RequestContext<'_>, path: &Path) -> Response<ResponseBody> {
    let file = match fs::File::open(path).await {
        Ok(f) => f,
        Err(e) => {
            logger::log_error(&format!("Failed to open file '{}': {e}", path.display()));
            return http::build_404_response();
        }
    };
    let metadata = match file.metadata().await {
        Ok(m) => m,
        Err(e) => {
            logger::log_error(&format!("Failed to stat file '{}': {e}", path.display()));
            return http::build_404_response();
        }
    };
    let modified = metadata.modified().ok();

    if let Some(modified) = modified {
        if cache::is_not_modified(ctx.if_modified_since, ctx.has_if_none_match, modified) {
            return http::build_304_response(&cache::format_http_date(modified));
        }
    }

    let body = if ctx.is_head {
        body::empty()
    } else {
        body::file_stream(file)
    };
    let last_modified = modified.map(cache::format_http_date);
    http::response::build_file_response(
        body,
        metadata.len(),
        mime::content_type_for(path),
        last_modified.as_deref(),
    )
}

/// Canonicalize `path` and confirm it is still inside `root`
///
/// Returns `None` when the path does not exist or escapes the root (for
/// instance through a symlink).
async fn within_root(path: &Path, root: &Path, request_path: &str) -> Option<PathBuf> {
    let canonical = fs::canonicalize(path).await.ok()?;
    if canonical.starts_with(root) {
        Some(canonical)
    } else {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {request_path} -> {}",
            canonical.display()
        ));
        None
    }
}

/// Percent-decode a request path, replacing invalid UTF-8
pub fn decode_path(path: &str) -> Cow<'_, str> {
    match urlencoding::decode(path) {
        Ok(decoded) => decoded,
        Err(_) => Cow::Owned(
            String::from_utf8_lossy(&urlencoding::decode_binary(path.as_bytes())).into_owned(),
        ),
    }
}

/// Turn a decoded URL path into a path relative to the serving root
///
/// Empty and `.` segments are dropped and `..` pops the previous segment;
/// popping past the root is a no-op, so the result never climbs above it.
/// Returns `None` when a segment cannot name a single file on this platform.
pub fn relative_path(decoded: &str) -> Option<PathBuf> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s if !is_plain_segment(s) => return None,
            s => segments.push(s),
        }
    }
    Some(segments.iter().collect())
}

/// Backslash is an ordinary file name character on unix
#[cfg(unix)]
const fn is_plain_segment(_segment: &str) -> bool {
    true
}

/// Backslash and drive prefixes act as separators on Windows
#[cfg(not(unix))]
fn is_plain_segment(segment: &str) -> bool {
    !segment.contains(['\\', ':'])
}
