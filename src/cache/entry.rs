//! Single cache entry: payload, freshness window, integrity tag, and the
//! load/revalidate lifecycle.
//!
//! An entry moves `Empty → Loading → Ready` (or `Failed`) and back to
//! `Loading` when its freshness window lapses. At most one load is in
//! flight per entry; every concurrent reader of a loading entry is parked
//! on a oneshot waiter and woken exactly once by the load's terminal
//! transition. A failed entry stays failed until an explicit [`CacheEntry::load`]
//! replaces it — there is no retry schedule, and a source that never
//! completes leaves the entry loading indefinitely.

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

use super::source::{ReloadSource, SourceData};

/// Freshness window applied when none is configured explicitly.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Error surfaced to readers of an entry.
///
/// Kept cheap to clone: one terminal load error fans out to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The reload source failed before the payload was complete.
    #[error("source failed: {0}")]
    Source(String),
    /// The entry holds no data and has no source to load it from.
    #[error("entry has no reload source")]
    NoSource,
    /// The entry went away before its load finished.
    #[error("load abandoned")]
    Cancelled,
}

/// A ready payload plus the metadata a responder needs.
#[derive(Debug, Clone)]
pub struct CachedPayload {
    /// The complete body. `Bytes` clones are refcounted, so handing this to
    /// many concurrent readers is cheap.
    pub body: Bytes,
    /// Hex-encoded SHA-256 of `body`, computed over the chunks in arrival
    /// order. Stable for identical content regardless of chunking.
    pub etag: String,
    /// MIME type attached at entry creation, if any.
    pub media_type: Option<String>,
    /// When this payload stops being fresh. `None` means never: the entry
    /// had no reload source, so the data is valid indefinitely.
    pub expires_at: Option<Instant>,
}

impl CachedPayload {
    /// Whether the payload is still inside its freshness window.
    pub fn is_fresh(&self) -> bool {
        match self.expires_at {
            None => true,
            Some(at) => Instant::now() < at,
        }
    }

    /// Seconds of freshness remaining, truncated. `None` if never expiring.
    pub fn fresh_for_secs(&self) -> Option<u64> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()).as_secs())
    }
}

/// Payload equality is content equality.
impl PartialEq for CachedPayload {
    fn eq(&self, other: &Self) -> bool {
        self.body == other.body && self.etag == other.etag
    }
}

enum EntryState {
    Empty,
    Loading,
    Ready(CachedPayload),
    Failed(CacheError),
}

type LoadResult = Result<CachedPayload, CacheError>;

struct EntryInner {
    state: EntryState,
    source: Option<Arc<dyn ReloadSource>>,
    waiters: Vec<oneshot::Sender<LoadResult>>,
    /// Bumped on every load start. A finishing load installs its result only
    /// if its epoch is still current, so a superseded load can neither
    /// clobber a newer payload nor mix bytes into it.
    epoch: u64,
}

struct Shared {
    key: String,
    ttl: Duration,
    media_type: Option<String>,
    inner: Mutex<EntryInner>,
}

/// One cached keyed payload. Cloning the handle is cheap and shares state.
#[derive(Clone)]
pub struct CacheEntry {
    shared: Arc<Shared>,
}

impl CacheEntry {
    /// Create an empty entry with no reload source.
    ///
    /// Useful together with [`CacheEntry::load`] for seeding generated
    /// content; reading it before any load resolves to
    /// [`CacheError::NoSource`].
    pub fn new(key: impl Into<String>, ttl: Duration, media_type: Option<String>) -> Self {
        Self::build(key.into(), ttl, media_type, None)
    }

    /// Create an empty entry that knows how to (re)populate itself.
    ///
    /// The first read triggers the first load; later reads after the
    /// freshness window lapses trigger reloads from the same source.
    pub fn with_source(
        key: impl Into<String>,
        ttl: Duration,
        media_type: Option<String>,
        source: Arc<dyn ReloadSource>,
    ) -> Self {
        Self::build(key.into(), ttl, media_type, Some(source))
    }

    fn build(
        key: String,
        ttl: Duration,
        media_type: Option<String>,
        source: Option<Arc<dyn ReloadSource>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                key,
                ttl,
                media_type,
                inner: Mutex::new(EntryInner {
                    state: EntryState::Empty,
                    source,
                    waiters: Vec::new(),
                    epoch: 0,
                }),
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.shared.key
    }

    pub fn media_type(&self) -> Option<&str> {
        self.shared.media_type.as_deref()
    }

    /// (Re)populate the entry from `data`, installing `source` as the new
    /// reload capability (or none, making the result valid forever).
    ///
    /// Returns immediately; the data is consumed on a background task. Any
    /// load already in flight is superseded: the later call wins, and
    /// readers parked before either call observe only the later result.
    /// A stream that errors fails the entry and notifies every waiter.
    pub fn load(&self, data: SourceData, source: Option<Arc<dyn ReloadSource>>) {
        let epoch = {
            let mut inner = self.shared.inner.lock();
            inner.source = source;
            inner.state = EntryState::Loading;
            inner.epoch += 1;
            inner.epoch
        };
        self.spawn_load(read_source(data), epoch);
    }

    /// Check freshness, kicking off an asynchronous reload if needed.
    ///
    /// Returns `true` when the entry is fresh and readable without work.
    /// Returns `false` when a reload is now running (or was already — calling
    /// this repeatedly while loading never starts a second load), and also
    /// for failed entries, which only an explicit [`CacheEntry::load`]
    /// revives.
    pub fn revalidate(&self) -> bool {
        let mut inner = self.shared.inner.lock();
        let stale = match &inner.state {
            EntryState::Loading | EntryState::Failed(_) => return false,
            EntryState::Ready(payload) => !payload.is_fresh(),
            EntryState::Empty => true,
        };
        if !stale {
            return true;
        }
        self.begin_reload_locked(&mut inner);
        false
    }

    /// Resolve with the entry's payload once it is ready, or with the error
    /// that made it fail.
    ///
    /// A fresh entry resolves with its current payload. A stale or empty
    /// entry first triggers a (single) reload; every caller that arrives
    /// while that load is in flight is parked and woken exactly once with
    /// the same outcome, so N concurrent readers cost one load.
    pub async fn await_ready(&self) -> LoadResult {
        let rx = {
            let mut inner = self.shared.inner.lock();
            match &inner.state {
                EntryState::Failed(err) => return Err(err.clone()),
                EntryState::Ready(payload) if payload.is_fresh() => return Ok(payload.clone()),
                EntryState::Loading => {}
                EntryState::Ready(_) | EntryState::Empty => {
                    if !self.begin_reload_locked(&mut inner) {
                        return Err(CacheError::NoSource);
                    }
                }
            }
            let (tx, rx) = oneshot::channel();
            inner.waiters.push(tx);
            rx
        };
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Cancelled),
        }
    }

    /// Start a reload from the configured source. Caller holds the lock.
    /// Returns `false` when there is no source to load from.
    fn begin_reload_locked(&self, inner: &mut EntryInner) -> bool {
        let Some(source) = inner.source.clone() else {
            return false;
        };
        inner.state = EntryState::Loading;
        inner.epoch += 1;
        debug!("reloading cache entry {}", self.shared.key);
        self.spawn_load(
            async move {
                match source.fetch().await {
                    Ok(data) => read_source(data).await,
                    Err(err) => Err(CacheError::Source(err.to_string())),
                }
            },
            inner.epoch,
        );
        true
    }

    fn spawn_load(
        &self,
        work: impl Future<Output = Result<(Bytes, String), CacheError>> + Send + 'static,
        epoch: u64,
    ) {
        let entry = self.clone();
        tokio::spawn(async move {
            let result = work.await;
            entry.finish(epoch, result);
        });
    }

    /// Terminal transition of one load: install the payload (or the failure)
    /// and wake every parked reader. A superseded load falls out silently;
    /// its waiters stay parked for the load that replaced it.
    fn finish(&self, epoch: u64, result: Result<(Bytes, String), CacheError>) {
        let (waiters, outcome) = {
            let mut inner = self.shared.inner.lock();
            if epoch != inner.epoch {
                return;
            }
            let outcome = match result {
                Ok((body, etag)) => {
                    let expires_at = inner
                        .source
                        .as_ref()
                        .map(|_| Instant::now() + self.shared.ttl);
                    let payload = CachedPayload {
                        body,
                        etag,
                        media_type: self.shared.media_type.clone(),
                        expires_at,
                    };
                    inner.state = EntryState::Ready(payload.clone());
                    Ok(payload)
                }
                Err(err) => {
                    debug!("cache entry {} failed: {}", self.shared.key, err);
                    inner.state = EntryState::Failed(err.clone());
                    Err(err)
                }
            };
            (std::mem::take(&mut inner.waiters), outcome)
        };
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Drain a source into a contiguous payload, hashing chunks as they arrive.
async fn read_source(data: SourceData) -> Result<(Bytes, String), CacheError> {
    match data {
        SourceData::Buffer(body) => {
            let etag = hex::encode(Sha256::digest(&body));
            Ok((body, etag))
        }
        SourceData::Stream(mut stream) => {
            let mut hasher = Sha256::new();
            let mut buf = BytesMut::new();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|err| CacheError::Source(err.to_string()))?;
                hasher.update(&chunk);
                buf.extend_from_slice(&chunk);
            }
            Ok((buf.freeze(), hex::encode(hasher.finalize())))
        }
    }
}
