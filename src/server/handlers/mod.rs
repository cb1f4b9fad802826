//! Request handlers.
//!
//! Everything content-bearing goes through [`serve_entry`]: revalidate the
//! cache entry, wait for it to be ready, then render the payload with
//! validation and freshness headers (or a `304` when the client's
//! `If-None-Match` already matches). A failed entry renders as a fixed
//! plain-text `500`.

pub mod assets;
pub mod feed;
pub mod health;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::time::Instant;

use crate::cache::{CacheEntry, CachedPayload};
use crate::error::Result;
use crate::metrics;

/// Catch-all for unknown paths.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "404 Not Found",
    )
}

/// Serve one cache entry as an HTTP response.
pub(crate) async fn serve_entry(
    entry: &CacheEntry,
    endpoint: &'static str,
    request_headers: &HeaderMap,
) -> Result<Response> {
    let start = Instant::now();

    if entry.revalidate() {
        metrics::record_cache_hit(endpoint);
    } else {
        metrics::record_cache_miss(endpoint);
    }

    let payload = match entry.await_ready().await {
        Ok(payload) => payload,
        Err(err) => {
            metrics::record_origin_error();
            metrics::record_request(endpoint, 500);
            metrics::record_duration(endpoint, start);
            return Err(err.into());
        }
    };

    let response = respond_cached(&payload, request_headers);
    metrics::record_request(endpoint, response.status().as_u16());
    metrics::record_duration(endpoint, start);
    Ok(response)
}

/// Render a ready payload: `ETag` from the content hash, `Cache-Control`
/// from the remaining freshness (omitted for never-expiring entries),
/// `Content-Type` from the entry's media type. A matching `If-None-Match`
/// short-circuits to an empty `304`.
pub(crate) fn respond_cached(payload: &CachedPayload, request_headers: &HeaderMap) -> Response {
    let etag = format!("\"{}\"", payload.etag);

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, value);
    }
    if let Some(secs) = payload.fresh_for_secs() {
        if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={secs}")) {
            headers.insert(header::CACHE_CONTROL, value);
        }
    }
    if let Some(media_type) = &payload.media_type {
        if let Ok(value) = HeaderValue::from_str(media_type) {
            headers.insert(header::CONTENT_TYPE, value);
        }
    }

    let revalidated = request_headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        == Some(etag.as_str());

    if revalidated {
        (StatusCode::NOT_MODIFIED, headers, Body::empty()).into_response()
    } else {
        (StatusCode::OK, headers, Body::from(payload.body.clone())).into_response()
    }
}
