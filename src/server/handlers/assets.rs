//! Static asset responder.
//!
//! Maps a request path to a file under the configured asset root and
//! serves it through the content cache. Path sanitization and the
//! does-the-file-exist check both happen before the cache is consulted:
//! a missing file is a plain 404, never a cache state.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use std::path::{Component, PathBuf};
use std::sync::Arc;

use super::serve_entry;
use crate::cache::{CacheEntry, FileSource};
use crate::error::{Result, RiptideError};
use crate::server::state::AppState;

/// Serve a file from the static root.
pub async fn serve_asset(
    Path(path): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response> {
    serve_file(&state, &path, &headers).await
}

/// `/favicon.ico` is an alias for `/static/icon.ico`.
pub async fn serve_favicon(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    serve_file(&state, "icon.ico", &headers).await
}

async fn serve_file(state: &AppState, raw: &str, headers: &HeaderMap) -> Result<Response> {
    let rel = sanitize_path(raw)?;
    let fs_path = state.config.static_root.join(&rel);

    let meta = tokio::fs::metadata(&fs_path)
        .await
        .map_err(|_| RiptideError::NotFound)?;
    if !meta.is_file() {
        return Err(RiptideError::NotFound);
    }

    let key = format!("static:{}", rel.to_string_lossy());
    let ttl = state.cache.default_ttl();
    let entry = state.cache.get_with(&key, || {
        CacheEntry::with_source(
            &key,
            ttl,
            media_type_for(&rel).map(str::to_string),
            Arc::new(FileSource::new(fs_path.clone())),
        )
    });

    serve_entry(&entry, "static", headers).await
}

/// Reduce a request path to a safe relative path: plain normal components
/// only. Anything smelling of traversal (`..`, absolute paths, backslashes,
/// NUL) is rejected outright rather than normalized.
fn sanitize_path(raw: &str) -> Result<PathBuf> {
    if raw.contains('\0') || raw.contains('\\') {
        return Err(RiptideError::InvalidPath);
    }
    let mut clean = PathBuf::new();
    for component in std::path::Path::new(raw).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return Err(RiptideError::InvalidPath),
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(RiptideError::InvalidPath);
    }
    Ok(clean)
}

/// MIME type by file extension; unknown extensions get no Content-Type.
fn media_type_for(path: &std::path::Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "txt" => Some("text/plain; charset=utf-8"),
        "html" => Some("text/html; charset=utf-8"),
        "css" => Some("text/css"),
        "js" => Some("application/javascript"),
        "svg" => Some("image/svg+xml"),
        "png" => Some("image/png"),
        "ico" => Some("image/vnd.microsoft.icon"),
        _ => None,
    }
}
