//! One opened archive: the I/O stack, the sorted entry list, the prefetch
//! window and a cursor stepping through it.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::asset::DisplayAsset;
use crate::config::Config;
use crate::error::{DecodeError, SessionError, WindowError};
use crate::io::{CacheStats, ChunkCacheReader, HttpRangeReader, LocalFileReader, ReadAt};
use crate::natural::sort_natural;
use crate::prefetch::{AsyncAsset, EntryDecoder, PrefetchWindow};
use crate::zip::{ZipArchive, ZipEntry};

/// The cached random-access source every session reads through.
pub type SessionSource = ChunkCacheReader<Box<dyn ReadAt>>;

/// `true` for locations that should be fetched over HTTP.
pub fn is_http_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Decodes archive entries, addressed by their position in natural order.
pub struct ArchiveDecoder<R> {
    archive: ZipArchive<R>,
    entries: Vec<ZipEntry>,
}

impl<R: ReadAt> ArchiveDecoder<R> {
    /// Take the archive's file entries (directories dropped) in natural order.
    pub fn new(archive: ZipArchive<R>) -> Self {
        let mut entries: Vec<ZipEntry> = archive
            .entries()
            .iter()
            .filter(|entry| !entry.is_dir())
            .cloned()
            .collect();
        sort_natural(&mut entries, |entry| entry.name.as_str());
        Self { archive, entries }
    }

    /// File entries in display order.
    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    /// Raw contents of the entry at `index`.
    pub async fn read(&self, index: usize) -> Result<Vec<u8>, DecodeError> {
        let entry = self
            .entries
            .get(index)
            .ok_or_else(|| DecodeError::Invalid {
                name: format!("entry {index}"),
                reason: "no such entry".into(),
            })?;
        self.archive
            .read_entry(entry)
            .await
            .map_err(|source| DecodeError::Read {
                name: entry.name.clone(),
                source: source.into(),
            })
    }
}

#[async_trait]
impl<R: ReadAt + 'static> EntryDecoder for ArchiveDecoder<R> {
    type Output = DisplayAsset;

    fn entry_count(&self) -> usize {
        self.entries.len()
    }

    async fn decode(&self, index: usize) -> Result<DisplayAsset, DecodeError> {
        let data = self.read(index).await?;
        Ok(DisplayAsset::from_bytes(&self.entries[index].name, &data))
    }
}

/// A remote or local archive opened for sequential viewing.
pub struct ArchiveSession {
    location: String,
    source: Arc<SessionSource>,
    remote: Option<Arc<HttpRangeReader>>,
    window: PrefetchWindow<ArchiveDecoder<Arc<SessionSource>>>,
    index: usize,
}

impl ArchiveSession {
    /// Open `location` (an `http(s)://` URL or a local path) and list it.
    ///
    /// The cursor starts on the first entry; nothing is decoded until the
    /// first call to [`current`](Self::current) or a movement.
    pub async fn open(location: &str, config: &Config) -> Result<Self, SessionError> {
        let (inner, remote): (Box<dyn ReadAt>, _) = if is_http_url(location) {
            let reader = Arc::new(HttpRangeReader::open_with(location, &config.http).await?);
            (Box::new(reader.clone()) as Box<dyn ReadAt>, Some(reader))
        } else {
            let reader = LocalFileReader::open(Path::new(location))?;
            (Box::new(reader) as Box<dyn ReadAt>, None)
        };

        let source = Arc::new(ChunkCacheReader::with_config(inner, config.cache));
        let archive = ZipArchive::open(source.clone()).await?;
        let decoder = ArchiveDecoder::new(archive);
        if decoder.entry_count() == 0 {
            return Err(SessionError::Empty {
                location: location.to_string(),
            });
        }

        info!(location, entries = decoder.entry_count(), "opened archive session");

        Ok(Self {
            location: location.to_string(),
            source,
            remote,
            window: PrefetchWindow::with_config(decoder, config.window),
            index: 0,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// File entries in display order.
    pub fn entries(&self) -> &[ZipEntry] {
        self.window.decoder().entries()
    }

    pub fn len(&self) -> usize {
        self.window.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cursor position.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_entry(&self) -> &ZipEntry {
        &self.entries()[self.index]
    }

    /// The asset under the cursor.
    pub fn current(&self) -> Result<Arc<AsyncAsset<DisplayAsset>>, WindowError> {
        self.window.load(self.index)
    }

    /// Step forward. `None` at the last entry.
    pub fn next(&mut self) -> Option<Arc<AsyncAsset<DisplayAsset>>> {
        let next = self.index + 1;
        if next >= self.len() {
            return None;
        }
        self.seek(next).ok()
    }

    /// Step back. `None` at the first entry.
    pub fn prev(&mut self) -> Option<Arc<AsyncAsset<DisplayAsset>>> {
        let prev = self.index.checked_sub(1)?;
        self.seek(prev).ok()
    }

    /// Jump to `index`.
    pub fn seek(&mut self, index: usize) -> Result<Arc<AsyncAsset<DisplayAsset>>, WindowError> {
        let asset = self.window.load(index)?;
        self.index = index;
        Ok(asset)
    }

    /// Raw bytes of an entry, bypassing the window.
    pub async fn read_raw(&self, index: usize) -> Result<Vec<u8>, DecodeError> {
        self.window.decoder().read(index).await
    }

    pub fn window(&self) -> &PrefetchWindow<ArchiveDecoder<Arc<SessionSource>>> {
        &self.window
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.source.stats().await
    }

    /// Bytes pulled over the network, for HTTP sessions.
    pub fn transferred_bytes(&self) -> Option<u64> {
        self.remote.as_ref().map(|r| r.transferred_bytes())
    }

    /// Range requests issued, for HTTP sessions.
    pub fn requests(&self) -> Option<u64> {
        self.remote.as_ref().map(|r| r.requests())
    }
}
