//! State-machine and concurrency behavior of the content cache, driven
//! entirely through its public API.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::future::join_all;
use parking_lot::Mutex;
use riptide::cache::{
    CacheEntry, CacheError, ContentCache, DEFAULT_TTL, ReloadSource, SourceData,
};
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
const WORLD_SHA256: &str = "486ea46224d1bb4fb680f34f7c9ad96a8f24ec88be73ea8e5a6c65260e9cb8a7";
const BBBB_SHA256: &str = "4a8d8134f29b0b7b60c126f5532bc9f5d9bb73037373cf6fb872d81f1dcefdfd";

/// Source that serves a scripted sequence of bodies, repeating the last one,
/// and counts how often it is asked.
struct ScriptedSource {
    hits: AtomicUsize,
    responses: Mutex<VecDeque<&'static str>>,
    delay: Duration,
}

impl ScriptedSource {
    fn new(responses: &[&'static str], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            hits: AtomicUsize::new(0),
            responses: Mutex::new(responses.iter().copied().collect()),
            delay,
        })
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReloadSource for ScriptedSource {
    async fn fetch(&self) -> io::Result<SourceData> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let body = {
            let mut responses = self.responses.lock();
            if responses.len() > 1 {
                responses.pop_front().expect("non-empty script")
            } else {
                *responses.front().expect("non-empty script")
            }
        };
        Ok(SourceData::from(body))
    }
}

/// Source that always fails, counting attempts.
struct FailingSource {
    hits: AtomicUsize,
}

impl FailingSource {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            hits: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ReloadSource for FailingSource {
    async fn fetch(&self) -> io::Result<SourceData> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::other("origin exploded"))
    }
}

/// A byte stream fed by hand from the test body.
fn channel_stream() -> (
    tokio::sync::mpsc::UnboundedSender<io::Result<Bytes>>,
    SourceData,
) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });
    (tx, SourceData::Stream(stream.boxed()))
}

#[tokio::test]
async fn concurrent_readers_share_one_load() {
    let source = ScriptedSource::new(&["hello"], Duration::from_millis(50));
    let entry = CacheEntry::with_source("shared", DEFAULT_TTL, None, source.clone());

    let results = join_all((0..8).map(|_| entry.await_ready())).await;

    assert_eq!(source.hits(), 1);
    for result in results {
        let payload = result.unwrap();
        assert_eq!(payload.body, Bytes::from("hello"));
        assert_eq!(payload.etag, HELLO_SHA256);
    }
}

#[tokio::test]
async fn stale_entry_reloads_once_and_advances_expiry() {
    let source = ScriptedSource::new(&["hello", "world"], Duration::ZERO);
    let entry = CacheEntry::with_source("volatile", Duration::from_millis(100), None, source.clone());

    let payload = entry.await_ready().await.unwrap();
    assert_eq!(payload.body, Bytes::from("hello"));
    assert_eq!(payload.etag, HELLO_SHA256);
    assert!(payload.expires_at.is_some());

    // Still fresh: no work.
    assert!(entry.revalidate());
    assert_eq!(source.hits(), 1);

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(!entry.revalidate());
    let payload = entry.await_ready().await.unwrap();
    assert_eq!(payload.body, Bytes::from("world"));
    assert_eq!(payload.etag, WORLD_SHA256);
    assert!(payload.is_fresh(), "expiry restarts from the reload");
    assert_eq!(source.hits(), 2);

    assert!(entry.revalidate());
}

#[tokio::test]
async fn entry_without_reload_source_is_valid_forever() {
    let entry = CacheEntry::new("immortal", Duration::from_millis(1), None);
    entry.load(SourceData::from("static content"), None);

    let payload = entry.await_ready().await.unwrap();
    assert_eq!(payload.expires_at, None);

    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(entry.revalidate());
    let payload = entry.await_ready().await.unwrap();
    assert_eq!(payload.body, Bytes::from("static content"));
}

#[tokio::test]
async fn failure_is_sticky_until_an_explicit_load() {
    let source = FailingSource::new();
    let entry = CacheEntry::with_source("doomed", DEFAULT_TTL, None, source.clone());

    let err = entry.await_ready().await.unwrap_err();
    assert!(matches!(err, CacheError::Source(ref msg) if msg.contains("origin exploded")));

    // No automatic retry: same answer, no new fetch.
    assert_eq!(entry.await_ready().await.unwrap_err(), err);
    assert!(!entry.revalidate());
    assert_eq!(source.hits.load(Ordering::SeqCst), 1);

    // An explicit load clears the failure.
    entry.load(SourceData::from("recovered"), None);
    let payload = entry.await_ready().await.unwrap();
    assert_eq!(payload.body, Bytes::from("recovered"));
}

#[tokio::test]
async fn sequential_loads_never_mix_payloads() {
    let entry = CacheEntry::new("swap", DEFAULT_TTL, None);

    entry.load(SourceData::from("AAAA"), None);
    let first = entry.await_ready().await.unwrap();
    assert_eq!(first.body, Bytes::from("AAAA"));

    entry.load(SourceData::from("BBBB"), None);
    let second = entry.await_ready().await.unwrap();
    assert_eq!(second.body, Bytes::from("BBBB"));
    assert_eq!(second.etag, BBBB_SHA256);
    assert_ne!(second.etag, first.etag);
}

#[tokio::test]
async fn later_load_supersedes_an_unfinished_one() {
    let entry = CacheEntry::new("raced", DEFAULT_TTL, None);

    // First load hangs on a hand-fed stream...
    let (tx, slow) = channel_stream();
    entry.load(slow, None);

    // ...and a second, complete load replaces it.
    entry.load(SourceData::from("BBBB"), None);
    let payload = entry.await_ready().await.unwrap();
    assert_eq!(payload.body, Bytes::from("BBBB"));

    // The first load finishing late must not clobber the newer payload.
    tx.send(Ok(Bytes::from("AA"))).unwrap();
    tx.send(Ok(Bytes::from("AA"))).unwrap();
    drop(tx);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let payload = entry.await_ready().await.unwrap();
    assert_eq!(payload.body, Bytes::from("BBBB"));
    assert_eq!(payload.etag, BBBB_SHA256);
}

#[tokio::test]
async fn mid_stream_error_fails_every_joined_waiter() {
    let (tx, data) = channel_stream();
    let entry = CacheEntry::new("partial", DEFAULT_TTL, None);
    entry.load(data, None);

    // Three chunks arrive fine...
    for _ in 0..3 {
        tx.send(Ok(Bytes::from("chunk"))).unwrap();
    }

    // ...two readers join while the stream is still open...
    let first = tokio::spawn({
        let entry = entry.clone();
        async move { entry.await_ready().await }
    });
    let second = tokio::spawn({
        let entry = entry.clone();
        async move { entry.await_ready().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    // ...then the source dies.
    tx.send(Err(io::Error::other("connection reset"))).unwrap();
    drop(tx);

    let first = first.await.unwrap().unwrap_err();
    let second = second.await.unwrap().unwrap_err();
    assert!(matches!(first, CacheError::Source(ref msg) if msg.contains("connection reset")));
    assert_eq!(first, second);

    // No partial payload survives.
    assert!(entry.await_ready().await.is_err());
}

#[tokio::test]
async fn burst_against_one_key_creates_one_entry_and_one_load() {
    let cache = ContentCache::default();
    let source = ScriptedSource::new(&["hello"], Duration::from_millis(30));
    let inits = Arc::new(AtomicUsize::new(0));

    let tasks = (0..10).map(|_| {
        let cache = cache.clone();
        let source = source.clone();
        let inits = Arc::clone(&inits);
        tokio::spawn(async move {
            let entry = cache.get_with("hot", || {
                inits.fetch_add(1, Ordering::SeqCst);
                CacheEntry::with_source("hot", DEFAULT_TTL, None, source)
            });
            entry.await_ready().await
        })
    });

    for task in join_all(tasks).await {
        assert_eq!(task.unwrap().unwrap().body, Bytes::from("hello"));
    }
    assert_eq!(inits.load(Ordering::SeqCst), 1);
    assert_eq!(source.hits(), 1);
}

#[tokio::test]
async fn removal_detaches_in_flight_loads() {
    let cache = ContentCache::default();
    let source = ScriptedSource::new(&["hello"], Duration::from_millis(50));
    let entry = cache.put(CacheEntry::with_source("doomed", DEFAULT_TTL, None, source));

    let waiter = tokio::spawn({
        let entry = entry.clone();
        async move { entry.await_ready().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(cache.remove("doomed"));

    // The load completes against the detached entry; the waiter still gets
    // its payload, the cache just no longer holds it.
    let payload = waiter.await.unwrap().unwrap();
    assert_eq!(payload.body, Bytes::from("hello"));
    assert!(cache.lookup("doomed").is_none());
}
