mod chunk_cache;
mod http;
mod local;

pub use chunk_cache::{CacheStats, ChunkCacheConfig, ChunkCacheReader, CHUNK_SIZE, MAX_CHUNKS};
pub use http::{HttpConfig, HttpRangeReader};
pub use local::LocalFileReader;

use async_trait::async_trait;

use crate::error::FetchError;

/// Trait for random access reading from a data source of known size
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer.
    ///
    /// Returns the number of bytes placed in `buf`. A count shorter than
    /// `buf.len()` means the read ran past the end of the source.
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, FetchError>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill `buf` completely, treating end of data as an error.
    async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), FetchError> {
        let got = self.read_at(offset, buf).await?;
        if got < buf.len() {
            return Err(FetchError::UnexpectedEof {
                offset,
                wanted: buf.len(),
                got,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<R: ReadAt + ?Sized> ReadAt for std::sync::Arc<R> {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, FetchError> {
        (**self).read_at(offset, buf).await
    }

    fn size(&self) -> u64 {
        (**self).size()
    }
}

#[async_trait]
impl<R: ReadAt + ?Sized> ReadAt for Box<R> {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, FetchError> {
        (**self).read_at(offset, buf).await
    }

    fn size(&self) -> u64 {
        (**self).size()
    }
}
