//! Reload sources: where an entry's bytes come from.
//!
//! A [`ReloadSource`] is the capability an entry invokes when its freshness
//! window lapses. It yields [`SourceData`] — either a complete in-memory
//! buffer or a chunked byte stream; the entry consumes either shape the
//! same way.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::Client;
use std::io;
use std::path::PathBuf;
use tokio_util::io::ReaderStream;

use crate::http_retry::{RetryConfig, fetch_with_retry};

/// Chunked bytes with a terminal success/error signal.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// What a reload source produces.
pub enum SourceData {
    /// A finite, already-materialized payload.
    Buffer(Bytes),
    /// A stream of chunks; the payload is complete when the stream ends.
    Stream(ByteStream),
}

impl From<Bytes> for SourceData {
    fn from(body: Bytes) -> Self {
        SourceData::Buffer(body)
    }
}

impl From<Vec<u8>> for SourceData {
    fn from(body: Vec<u8>) -> Self {
        SourceData::Buffer(Bytes::from(body))
    }
}

impl From<String> for SourceData {
    fn from(body: String) -> Self {
        SourceData::Buffer(Bytes::from(body))
    }
}

impl From<&'static str> for SourceData {
    fn from(body: &'static str) -> Self {
        SourceData::Buffer(Bytes::from_static(body.as_bytes()))
    }
}

/// Capability to produce fresh bytes for a cache entry.
#[async_trait]
pub trait ReloadSource: Send + Sync {
    async fn fetch(&self) -> io::Result<SourceData>;
}

/// Streams a file from disk.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReloadSource for FileSource {
    async fn fetch(&self) -> io::Result<SourceData> {
        let file = tokio::fs::File::open(&self.path).await?;
        Ok(SourceData::Stream(ReaderStream::new(file).boxed()))
    }
}

/// Streams an HTTP response body, with bounded retry on the request.
pub struct HttpSource {
    client: Client,
    url: String,
    retry: RetryConfig,
}

impl HttpSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            retry: RetryConfig::default(),
        }
    }
}

#[async_trait]
impl ReloadSource for HttpSource {
    async fn fetch(&self) -> io::Result<SourceData> {
        let response = fetch_with_retry(&self.client, &self.url, &self.retry)
            .await
            .map_err(io::Error::other)?;
        let stream = response.bytes_stream().map(|chunk| chunk.map_err(io::Error::other));
        Ok(SourceData::Stream(stream.boxed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    async fn collect(data: SourceData) -> Vec<u8> {
        match data {
            SourceData::Buffer(body) => body.to_vec(),
            SourceData::Stream(mut stream) => {
                let mut out = Vec::new();
                while let Some(chunk) = stream.next().await {
                    out.extend_from_slice(&chunk.unwrap());
                }
                out
            }
        }
    }

    #[tokio::test]
    async fn file_source_streams_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"alpha beta gamma").unwrap();

        let source = FileSource::new(file.path());
        let data = source.fetch().await.unwrap();
        assert_eq!(collect(data).await, b"alpha beta gamma");
    }

    #[tokio::test]
    async fn file_source_missing_file_errors() {
        let source = FileSource::new("/nonexistent/riptide-test-file");
        assert!(source.fetch().await.is_err());
    }

    #[tokio::test]
    async fn buffer_conversions() {
        assert_eq!(collect(SourceData::from("abc")).await, b"abc");
        assert_eq!(collect(SourceData::from(vec![1u8, 2, 3])).await, [1, 2, 3]);
        assert_eq!(collect(SourceData::from(String::from("xy"))).await, b"xy");
    }
}
