use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::error::ArchiveError;

pub const EOCD_SIGNATURE: [u8; 4] = *b"PK\x05\x06";
pub const EOCD_SIZE: usize = 22;

pub const ZIP64_LOCATOR_SIGNATURE: [u8; 4] = *b"PK\x06\x07";
pub const ZIP64_LOCATOR_SIZE: usize = 20;

pub const ZIP64_EOCD_SIGNATURE: [u8; 4] = *b"PK\x06\x06";
pub const ZIP64_EOCD_SIZE: usize = 56;

pub const CDFH_SIGNATURE: [u8; 4] = *b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

pub const LFH_SIGNATURE: [u8; 4] = *b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Extra-field tag carrying 64-bit sizes and offsets.
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Largest comment that can follow the end record.
pub const MAX_COMMENT_SIZE: usize = u16::MAX as usize;

fn truncated(what: &str) -> impl FnOnce(std::io::Error) -> ArchiveError + '_ {
    move |_| ArchiveError::Format(format!("truncated {what}"))
}

fn expect_signature(cursor: &mut Cursor<&[u8]>, want: [u8; 4], what: &str) -> Result<(), ArchiveError> {
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig).map_err(truncated(what))?;
    if sig != want {
        return Err(ArchiveError::Format(format!("bad {what} signature")));
    }
    Ok(())
}

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl From<u16> for CompressionMethod {
    fn from(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            other => CompressionMethod::Unknown(other),
        }
    }
}

impl CompressionMethod {
    pub fn label(self) -> &'static str {
        match self {
            CompressionMethod::Stored => "stored",
            CompressionMethod::Deflate => "deflate",
            CompressionMethod::Unknown(_) => "unknown",
        }
    }
}

/// Where the central directory lives, with ZIP64 values already applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryLocation {
    pub entries: u64,
    pub size: u64,
    pub offset: u64,
}

/// The classic end-of-central-directory record.
#[derive(Debug, Clone, Copy)]
pub struct EndRecord {
    pub entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndRecord {
    pub fn parse(data: &[u8]) -> Result<Self, ArchiveError> {
        let mut cursor = Cursor::new(data);
        expect_signature(&mut cursor, EOCD_SIGNATURE, "end of central directory")?;

        let mut read = || -> std::io::Result<Self> {
            let _disk = cursor.read_u16::<LittleEndian>()?;
            let _cd_disk = cursor.read_u16::<LittleEndian>()?;
            let _disk_entries = cursor.read_u16::<LittleEndian>()?;
            Ok(Self {
                entries: cursor.read_u16::<LittleEndian>()?,
                cd_size: cursor.read_u32::<LittleEndian>()?,
                cd_offset: cursor.read_u32::<LittleEndian>()?,
                comment_len: cursor.read_u16::<LittleEndian>()?,
            })
        };
        read().map_err(truncated("end of central directory"))
    }

    /// Any saturated field means the real value lives in the ZIP64 record.
    pub fn needs_zip64(&self) -> bool {
        self.entries == u16::MAX || self.cd_size == u32::MAX || self.cd_offset == u32::MAX
    }

    pub fn location(&self) -> DirectoryLocation {
        DirectoryLocation {
            entries: self.entries as u64,
            size: self.cd_size as u64,
            offset: self.cd_offset as u64,
        }
    }
}

/// Parse the ZIP64 end-of-central-directory locator, returning the offset of
/// the ZIP64 end record.
pub fn parse_zip64_locator(data: &[u8]) -> Result<u64, ArchiveError> {
    let mut cursor = Cursor::new(data);
    expect_signature(&mut cursor, ZIP64_LOCATOR_SIGNATURE, "ZIP64 locator")?;

    let mut read = || -> std::io::Result<u64> {
        let _disk = cursor.read_u32::<LittleEndian>()?;
        cursor.read_u64::<LittleEndian>()
    };
    read().map_err(truncated("ZIP64 locator"))
}

/// Parse the ZIP64 end-of-central-directory record.
pub fn parse_zip64_end(data: &[u8]) -> Result<DirectoryLocation, ArchiveError> {
    let mut cursor = Cursor::new(data);
    expect_signature(&mut cursor, ZIP64_EOCD_SIGNATURE, "ZIP64 end record")?;

    let mut read = || -> std::io::Result<DirectoryLocation> {
        let _record_size = cursor.read_u64::<LittleEndian>()?;
        let _made_by = cursor.read_u16::<LittleEndian>()?;
        let _needed = cursor.read_u16::<LittleEndian>()?;
        let _disk = cursor.read_u32::<LittleEndian>()?;
        let _cd_disk = cursor.read_u32::<LittleEndian>()?;
        let _disk_entries = cursor.read_u64::<LittleEndian>()?;
        Ok(DirectoryLocation {
            entries: cursor.read_u64::<LittleEndian>()?,
            size: cursor.read_u64::<LittleEndian>()?,
            offset: cursor.read_u64::<LittleEndian>()?,
        })
    };
    read().map_err(truncated("ZIP64 end record"))
}

/// One file or directory listed in the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    pub name: String,
    pub method: CompressionMethod,
    pub compressed_size: u64,
    pub size: u64,
    pub crc32: u32,
    /// Offset of the entry's local file header.
    pub header_offset: u64,
}

impl ZipEntry {
    /// Directory entries end with '/'
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }

    /// Parse one central directory file header, leaving the cursor on the
    /// next one.
    pub fn parse(cursor: &mut Cursor<&[u8]>) -> Result<Self, ArchiveError> {
        expect_signature(cursor, CDFH_SIGNATURE, "central directory header")?;
        Self::parse_body(cursor).map_err(truncated("central directory header"))
    }

    fn parse_body(cursor: &mut Cursor<&[u8]>) -> std::io::Result<Self> {
        let _made_by = cursor.read_u16::<LittleEndian>()?;
        let _needed = cursor.read_u16::<LittleEndian>()?;
        let _flags = cursor.read_u16::<LittleEndian>()?;
        let method = cursor.read_u16::<LittleEndian>()?;
        let _mod_time = cursor.read_u16::<LittleEndian>()?;
        let _mod_date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let mut size = cursor.read_u32::<LittleEndian>()? as u64;
        let name_len = cursor.read_u16::<LittleEndian>()? as usize;
        let extra_len = cursor.read_u16::<LittleEndian>()? as u64;
        let comment_len = cursor.read_u16::<LittleEndian>()? as u64;
        let _disk_start = cursor.read_u16::<LittleEndian>()?;
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let _external_attrs = cursor.read_u32::<LittleEndian>()?;
        let mut header_offset = cursor.read_u32::<LittleEndian>()? as u64;

        let mut name = vec![0u8; name_len];
        cursor.read_exact(&mut name)?;
        let name = String::from_utf8_lossy(&name).into_owned();

        // ZIP64 values appear in the extra field, in this order, only for
        // header fields that were saturated.
        let extra_end = cursor.position() + extra_len;
        while cursor.position() + 4 <= extra_end {
            let id = cursor.read_u16::<LittleEndian>()?;
            let len = cursor.read_u16::<LittleEndian>()? as u64;
            let field_end = cursor.position() + len;

            if id == ZIP64_EXTRA_ID {
                for field in [&mut size, &mut compressed_size, &mut header_offset] {
                    if *field == u32::MAX as u64 && cursor.position() + 8 <= field_end {
                        *field = cursor.read_u64::<LittleEndian>()?;
                    }
                }
            }
            cursor.set_position(field_end);
        }
        cursor.set_position(extra_end + comment_len);

        Ok(Self {
            name,
            method: method.into(),
            compressed_size,
            size,
            crc32,
            header_offset,
        })
    }
}

/// Length of the variable part (name + extra field) of a local file header.
pub fn local_header_tail(data: &[u8]) -> Result<u64, ArchiveError> {
    let mut cursor = Cursor::new(data);
    expect_signature(&mut cursor, LFH_SIGNATURE, "local file header")?;
    cursor.set_position(26);

    let mut read = || -> std::io::Result<u64> {
        let name_len = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_len = cursor.read_u16::<LittleEndian>()? as u64;
        Ok(name_len + extra_len)
    };
    read().map_err(truncated("local file header"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cdfh(name: &str, extra: &[u8], sizes: (u32, u32), offset: u32) -> Vec<u8> {
        let mut out = CDFH_SIGNATURE.to_vec();
        out.extend_from_slice(&[20, 0, 20, 0, 0, 0]);
        out.extend_from_slice(&8u16.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&0xDEADBEEFu32.to_le_bytes());
        out.extend_from_slice(&sizes.0.to_le_bytes());
        out.extend_from_slice(&sizes.1.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        out.extend_from_slice(&3u16.to_le_bytes());
        out.extend_from_slice(&[0; 8]);
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(extra);
        out.extend_from_slice(b"hey");
        out
    }

    #[test]
    fn test_parse_cdfh() {
        let mut data = cdfh("dir/a.png", &[], (10, 20), 99);
        data.extend_from_slice(b"next");
        let mut cursor = Cursor::new(&data[..]);

        let entry = ZipEntry::parse(&mut cursor).unwrap();
        assert_eq!(entry.name, "dir/a.png");
        assert_eq!(entry.method, CompressionMethod::Deflate);
        assert_eq!(entry.compressed_size, 10);
        assert_eq!(entry.size, 20);
        assert_eq!(entry.crc32, 0xDEADBEEF);
        assert_eq!(entry.header_offset, 99);
        assert!(!entry.is_dir());
        assert_eq!(&data[cursor.position() as usize..], b"next");
    }

    #[test]
    fn test_parse_cdfh_zip64_extra() {
        let mut extra = Vec::new();
        extra.extend_from_slice(&0x5455u16.to_le_bytes());
        extra.extend_from_slice(&1u16.to_le_bytes());
        extra.push(0);
        extra.extend_from_slice(&ZIP64_EXTRA_ID.to_le_bytes());
        extra.extend_from_slice(&16u16.to_le_bytes());
        extra.extend_from_slice(&(5u64 << 32).to_le_bytes());
        extra.extend_from_slice(&(6u64 << 32).to_le_bytes());

        let data = cdfh("big/", &extra, (u32::MAX, 7), u32::MAX);
        let entry = ZipEntry::parse(&mut Cursor::new(&data[..])).unwrap();

        assert_eq!(entry.size, 7);
        assert_eq!(entry.compressed_size, 5 << 32);
        assert_eq!(entry.header_offset, 6 << 32);
        assert!(entry.is_dir());
    }

    #[test]
    fn test_truncated_header() {
        let data = cdfh("a", &[], (1, 1), 0);
        let err = ZipEntry::parse(&mut Cursor::new(&data[..20])).unwrap_err();
        assert!(matches!(err, ArchiveError::Format(msg) if msg.contains("truncated")));
    }

    #[test]
    fn test_end_record() {
        let mut data = EOCD_SIGNATURE.to_vec();
        data.extend_from_slice(&[0, 0, 0, 0, 3, 0, 3, 0]);
        data.extend_from_slice(&120u32.to_le_bytes());
        data.extend_from_slice(&4000u32.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());

        let end = EndRecord::parse(&data).unwrap();
        assert!(!end.needs_zip64());
        assert_eq!(
            end.location(),
            DirectoryLocation {
                entries: 3,
                size: 120,
                offset: 4000
            }
        );

        data[0] = b'X';
        assert!(EndRecord::parse(&data).is_err());
    }

    #[test]
    fn test_compression_method_codes() {
        assert_eq!(CompressionMethod::from(0), CompressionMethod::Stored);
        assert_eq!(CompressionMethod::from(8), CompressionMethod::Deflate);
        assert_eq!(CompressionMethod::from(12), CompressionMethod::Unknown(12));
        assert_eq!(CompressionMethod::Deflate.label(), "deflate");
    }
}
