//! Crate-wide error type and its HTTP rendering.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::cache::CacheError;

#[derive(Debug, Error)]
pub enum RiptideError {
    #[error("origin fetch failed: {0}")]
    OriginFetch(#[from] reqwest::Error),

    #[error("cache load failed: {0}")]
    Cache(#[from] CacheError),

    #[error("feed parse error: {0}")]
    FeedParse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Request path rejected before it reached the filesystem or the cache.
    #[error("path rejected")]
    InvalidPath,

    #[error("not found")]
    NotFound,
}

pub type Result<T> = std::result::Result<T, RiptideError>;

impl IntoResponse for RiptideError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            RiptideError::NotFound => (StatusCode::NOT_FOUND, "404 Not Found"),
            RiptideError::InvalidPath => (StatusCode::BAD_REQUEST, "400 Bad Request"),
            RiptideError::OriginFetch(_) => (StatusCode::BAD_GATEWAY, "502 Bad Gateway"),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "500 Internal Server Error",
            ),
        };
        if status.is_server_error() {
            error!("request failed: {}", self);
        }
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}
