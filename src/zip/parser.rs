//! Low-level ZIP directory parser.
//!
//! ZIP files are read from the end: the end-of-central-directory record
//! (optionally preceded by ZIP64 records) says where the central directory is,
//! and the central directory lists every entry with the offset of its local
//! header. Listing an archive therefore touches only its tail, and reading an
//! entry touches only that entry's bytes.

use std::io::Cursor;
use tracing::debug;

use crate::error::ArchiveError;
use crate::io::ReadAt;

use super::structures::*;

/// Low-level ZIP file parser over any [`ReadAt`] source.
pub struct ZipParser<R> {
    reader: R,
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    pub fn new(reader: R) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Locate the central directory.
    pub async fn find_directory(&self) -> Result<DirectoryLocation, ArchiveError> {
        if self.size < EOCD_SIZE as u64 {
            return Err(ArchiveError::Format("file too small".into()));
        }

        // The end record sits somewhere in the last 22 + 65535 bytes,
        // depending on the archive comment.
        let tail_len = ((EOCD_SIZE + MAX_COMMENT_SIZE) as u64).min(self.size);
        let tail_start = self.size - tail_len;
        let mut tail = vec![0u8; tail_len as usize];
        self.reader.read_exact_at(tail_start, &mut tail).await?;

        let (end, at) = (0..=tail.len() - EOCD_SIZE)
            .rev()
            .filter(|&i| tail[i..i + 4] == EOCD_SIGNATURE)
            .find_map(|i| {
                let end = EndRecord::parse(&tail[i..i + EOCD_SIZE]).ok()?;
                (i + EOCD_SIZE + end.comment_len as usize == tail.len()).then_some((end, i))
            })
            .ok_or_else(|| ArchiveError::Format("end of central directory not found".into()))?;
        let end_offset = tail_start + at as u64;

        let location = if end.needs_zip64() {
            self.read_zip64_location(end_offset).await?
        } else {
            end.location()
        };

        debug!(
            entries = location.entries,
            offset = location.offset,
            size = location.size,
            "found central directory"
        );
        Ok(location)
    }

    async fn read_zip64_location(&self, end_offset: u64) -> Result<DirectoryLocation, ArchiveError> {
        let locator_offset = end_offset
            .checked_sub(ZIP64_LOCATOR_SIZE as u64)
            .ok_or_else(|| ArchiveError::Format("missing ZIP64 locator".into()))?;
        let mut locator = [0u8; ZIP64_LOCATOR_SIZE];
        self.reader.read_exact_at(locator_offset, &mut locator).await?;
        let record_offset = parse_zip64_locator(&locator)?;

        let mut record = [0u8; ZIP64_EOCD_SIZE];
        self.reader.read_exact_at(record_offset, &mut record).await?;
        parse_zip64_end(&record)
    }

    /// List every entry in the central directory, in directory order.
    pub async fn list_entries(&self) -> Result<Vec<ZipEntry>, ArchiveError> {
        let location = self.find_directory().await?;

        let fits = location
            .offset
            .checked_add(location.size)
            .is_some_and(|end| end <= self.size);
        if !fits || location.entries > location.size / CDFH_MIN_SIZE as u64 {
            return Err(ArchiveError::Format("central directory out of bounds".into()));
        }

        // One read for the whole directory; it is usually a handful of chunks.
        let mut directory = vec![0u8; location.size as usize];
        self.reader
            .read_exact_at(location.offset, &mut directory)
            .await?;

        let mut cursor = Cursor::new(&directory[..]);
        (0..location.entries)
            .map(|_| ZipEntry::parse(&mut cursor))
            .collect()
    }

    /// Offset of the first byte of the entry's (possibly compressed) data.
    pub async fn data_offset(&self, entry: &ZipEntry) -> Result<u64, ArchiveError> {
        let mut header = [0u8; LFH_SIZE];
        self.reader
            .read_exact_at(entry.header_offset, &mut header)
            .await?;
        let tail = local_header_tail(&header)?;
        Ok(entry.header_offset + LFH_SIZE as u64 + tail)
    }
}
