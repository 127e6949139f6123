//! ZIP archive directory parsing and entry reading.
//!
//! The parser only ever asks its source for byte ranges, so it runs equally
//! well over a local file or an HTTP range source behind a chunk cache.
//!
//! ## Supported Features
//!
//! - Standard ZIP format and ZIP64 end records / extra fields
//! - STORED and DEFLATE entries, verified against the directory's CRC-32
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support

mod archive;
mod parser;
mod structures;

pub use archive::ZipArchive;
pub use parser::ZipParser;
pub use structures::{CompressionMethod, DirectoryLocation, ZipEntry};
