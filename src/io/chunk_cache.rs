//! Fixed-size chunk cache in front of a random-access source.
//!
//! Directory-format parsers issue many small, scattered reads (a 22-byte
//! end record, a 46-byte header, a 30-byte local header...). Sent straight to
//! an HTTP source each of those would be a separate round trip. The cache turns
//! them into aligned fetches of [`CHUNK_SIZE`] bytes and keeps at most
//! [`MAX_CHUNKS`] of them resident.
//!
//! ## Eviction
//!
//! Eviction is first-in, first-out by the time a chunk was fetched. Reading a
//! resident chunk again does not postpone its eviction.

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::ReadAt;
use crate::error::FetchError;

/// Size of one cached chunk (256 KiB).
pub const CHUNK_SIZE: usize = 262_144;

/// Maximum number of resident chunks (16 MiB at the default chunk size).
pub const MAX_CHUNKS: usize = 64;

/// Chunk geometry for a [`ChunkCacheReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkCacheConfig {
    pub chunk_size: usize,
    pub max_chunks: usize,
}

impl Default for ChunkCacheConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            max_chunks: MAX_CHUNKS,
        }
    }
}

/// Counters describing how a cache has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Chunk visits served from memory.
    pub hits: u64,
    /// Chunks fetched from the wrapped source.
    pub misses: u64,
    /// Chunks dropped to respect the cap.
    pub evictions: u64,
    /// Chunks currently held.
    pub resident: usize,
}

struct ChunkState {
    slots: Vec<Option<Box<[u8]>>>,
    /// Resident chunk indices, oldest fetch first.
    resident: VecDeque<usize>,
    stats: CacheStats,
}

impl ChunkState {
    fn new(size: u64, config: &ChunkCacheConfig) -> Self {
        let count = size.div_ceil(config.chunk_size as u64) as usize;
        Self {
            slots: vec![None; count],
            resident: VecDeque::with_capacity(config.max_chunks + 1),
            stats: CacheStats::default(),
        }
    }

    /// Store a freshly fetched chunk, evicting the oldest one past the cap.
    fn admit(&mut self, index: usize, chunk: Box<[u8]>, max_chunks: usize) {
        self.slots[index] = Some(chunk);
        self.resident.push_back(index);
        self.stats.misses += 1;

        while self.resident.len() > max_chunks {
            let Some(oldest) = self.resident.pop_front() else {
                break;
            };
            self.slots[oldest] = None;
            self.stats.evictions += 1;
            debug!(chunk = oldest, "evicted chunk");
        }
        self.stats.resident = self.resident.len();
    }
}

/// Copy from `chunk[within..]` into `dst`, returning the byte count.
fn copy_from(chunk: &[u8], within: usize, dst: &mut [u8]) -> usize {
    let Some(src) = chunk.get(within..) else {
        return 0;
    };
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
    n
}

/// A [`ReadAt`] that serves reads from fixed-size cached chunks of another
/// [`ReadAt`].
///
/// All cache state sits behind one async lock, so concurrent `read_at` calls
/// are serialized and a chunk is never fetched twice by racing readers.
pub struct ChunkCacheReader<R> {
    inner: R,
    config: ChunkCacheConfig,
    state: Mutex<Option<ChunkState>>,
}

impl<R: ReadAt> ChunkCacheReader<R> {
    /// Wrap `inner` with the default 256 KiB × 64 geometry.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, ChunkCacheConfig::default())
    }

    /// Wrap `inner` with a custom geometry. Zero values are raised to one.
    pub fn with_config(inner: R, config: ChunkCacheConfig) -> Self {
        let config = ChunkCacheConfig {
            chunk_size: config.chunk_size.max(1),
            max_chunks: config.max_chunks.max(1),
        };
        Self {
            inner,
            config,
            state: Mutex::new(None),
        }
    }

    /// The wrapped source.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn config(&self) -> ChunkCacheConfig {
        self.config
    }

    pub async fn stats(&self) -> CacheStats {
        self.state
            .lock()
            .await
            .as_ref()
            .map(|state| state.stats)
            .unwrap_or_default()
    }

    /// Fetch chunk `index` in full from the wrapped source.
    async fn fetch_chunk(&self, index: usize) -> Result<Box<[u8]>, FetchError> {
        let start = index as u64 * self.config.chunk_size as u64;
        let want = (self.inner.size() - start).min(self.config.chunk_size as u64) as usize;

        trace!(chunk = index, start, want, "fetching chunk");
        let mut data = vec![0u8; want];
        self.inner.read_exact_at(start, &mut data).await?;
        Ok(data.into_boxed_slice())
    }
}

#[async_trait]
impl<R: ReadAt> ReadAt for ChunkCacheReader<R> {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, FetchError> {
        if buf.is_empty() || offset >= self.inner.size() {
            return Ok(0);
        }

        let mut guard = self.state.lock().await;
        let state = guard.get_or_insert_with(|| ChunkState::new(self.inner.size(), &self.config));

        let chunk_size = self.config.chunk_size as u64;
        let mut index = (offset / chunk_size) as usize;
        let mut within = (offset % chunk_size) as usize;
        let mut copied = 0;

        while copied < buf.len() {
            if index >= state.slots.len() {
                break;
            }

            let dst = &mut buf[copied..];
            let n = match state.slots[index].as_deref() {
                Some(chunk) => {
                    state.stats.hits += 1;
                    trace!(chunk = index, "chunk hit");
                    copy_from(chunk, within, dst)
                }
                None => {
                    let chunk = self.fetch_chunk(index).await.map_err(|source| FetchError::Chunk {
                        chunk: index as u64,
                        copied,
                        source: Box::new(source),
                    })?;
                    let n = copy_from(&chunk, within, dst);
                    state.admit(index, chunk, self.config.max_chunks);
                    n
                }
            };

            // Only the final chunk can be shorter than the offset into it.
            if n == 0 {
                break;
            }

            copied += n;
            index += 1;
            within = 0;
        }

        Ok(copied)
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }
}
