use flate2::Crc;
use flate2::read::DeflateDecoder;
use std::io::Read;
use tracing::debug;

use crate::error::ArchiveError;
use crate::io::ReadAt;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipEntry};

/// An opened ZIP archive: its directory plus the source to read entries from.
pub struct ZipArchive<R> {
    parser: ZipParser<R>,
    entries: Vec<ZipEntry>,
}

impl<R: ReadAt> ZipArchive<R> {
    /// Read the archive directory from `reader`.
    pub async fn open(reader: R) -> Result<Self, ArchiveError> {
        let parser = ZipParser::new(reader);
        let entries = parser.list_entries().await?;
        debug!(entries = entries.len(), "opened archive");
        Ok(Self { parser, entries })
    }

    /// Entries in central directory order.
    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    pub fn reader(&self) -> &R {
        self.parser.reader()
    }

    /// Read and decompress one entry into memory, checking size and CRC.
    pub async fn read_entry(&self, entry: &ZipEntry) -> Result<Vec<u8>, ArchiveError> {
        let name = || entry.name.clone();

        let offset = self.parser.data_offset(entry).await?;
        let in_bounds = offset
            .checked_add(entry.compressed_size)
            .is_some_and(|end| end <= self.reader().size());
        if !in_bounds {
            return Err(ArchiveError::Mismatch {
                name: name(),
                reason: "entry data runs past end of archive".into(),
            });
        }

        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.reader().read_exact_at(offset, &mut raw).await?;

        let data = match entry.method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                // The directory's size is untrusted: cap the pre-allocation, and
                // stop one byte past it so oversized output fails the size check.
                let mut out = Vec::with_capacity((entry.size as usize).min(raw.len() * 8));
                DeflateDecoder::new(&raw[..])
                    .take(entry.size.saturating_add(1))
                    .read_to_end(&mut out)
                    .map_err(|source| ArchiveError::Corrupt {
                        name: name(),
                        source,
                    })?;
                out
            }
            CompressionMethod::Unknown(method) => {
                return Err(ArchiveError::Unsupported {
                    name: name(),
                    method,
                });
            }
        };

        if data.len() as u64 != entry.size {
            return Err(ArchiveError::Mismatch {
                name: name(),
                reason: format!("expected {} bytes, got {}", entry.size, data.len()),
            });
        }

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            return Err(ArchiveError::Mismatch {
                name: name(),
                reason: format!("checksum {:08x} does not match {:08x}", crc.sum(), entry.crc32),
            });
        }

        Ok(data)
    }
}
