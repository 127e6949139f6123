//! Error types shared by the I/O stack and the prefetch window.

use thiserror::Error;

/// Failure to open a remote object.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The metadata probe could not be sent or completed.
    #[error("couldn't HEAD {url}: {source}")]
    Probe {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The metadata probe returned a non-success status.
    #[error("couldn't HEAD {url}, got response code {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The server did not report a usable `Content-Length`.
    #[error("{url} has unknown content-length")]
    UnknownLength { url: String },

    /// The server reported an empty object.
    #[error("{url} has zero content-length")]
    ZeroLength { url: String },

    /// A local file could not be opened or is empty.
    #[error("couldn't open {path}: {source}")]
    Local {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while fetching bytes from a random-access source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The ranged request could not be sent or its body could not be read.
    #[error("range request {range} failed: {source}")]
    Request {
        range: String,
        #[source]
        source: reqwest::Error,
    },

    /// The ranged request returned an unexpected status.
    #[error("range request {range} got response code {status}")]
    Status {
        range: String,
        status: reqwest::StatusCode,
    },

    /// The server answered with a different span than the one requested.
    #[error("range request {range} answered with {got}")]
    WrongRange { range: String, got: String },

    /// The response body ended before the requested span was filled.
    #[error("range request {range} returned {got} of {wanted} bytes")]
    ShortBody {
        range: String,
        wanted: usize,
        got: usize,
    },

    /// A chunk fetch inside the chunk cache failed.
    ///
    /// `copied` is the number of bytes already placed in the caller's buffer
    /// by the failing call.
    #[error("fetching chunk {chunk} failed after copying {copied} bytes: {source}")]
    Chunk {
        chunk: u64,
        copied: usize,
        #[source]
        source: Box<FetchError>,
    },

    /// A read needed more bytes than the source holds.
    #[error("unexpected end of data at offset {offset}: wanted {wanted} bytes, got {got}")]
    UnexpectedEof {
        offset: u64,
        wanted: usize,
        got: usize,
    },

    /// Local I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Bytes already copied into the caller's buffer before this error, if the
    /// error came out of a partially completed read.
    pub fn copied(&self) -> usize {
        match self {
            FetchError::Chunk { copied, .. } => *copied,
            FetchError::UnexpectedEof { got, .. } => *got,
            _ => 0,
        }
    }
}

/// Failure to produce a displayable asset from an archive entry.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Reading the entry's bytes failed.
    #[error("couldn't read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// The entry's bytes could not be turned into a displayable value.
    #[error("couldn't decode {name}: {reason}")]
    Invalid { name: String, reason: String },

    /// The decode task ended without publishing a result.
    #[error("decode of entry {index} was abandoned")]
    Abandoned { index: usize },
}

/// Misuse of the prefetch window.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    /// The requested index does not name an entry.
    #[error("entry index {index} out of range (archive has {count} entries)")]
    OutOfRange { index: usize, count: usize },
}

/// Failure to read the archive directory or an entry's contents.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The underlying source failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The bytes do not form a ZIP structure this parser understands.
    #[error("not a valid ZIP file: {0}")]
    Format(String),

    /// The entry uses a compression method other than STORED or DEFLATE.
    #[error("unsupported compression method {method} for {name}")]
    Unsupported { name: String, method: u16 },

    /// The entry's compressed stream is damaged.
    #[error("corrupt data in {name}: {source}")]
    Corrupt {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The entry's contents do not match the directory's size or checksum.
    #[error("{name}: {reason}")]
    Mismatch { name: String, reason: String },
}

/// Failure to open an archive session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Open(#[from] OpenError),

    #[error("couldn't open zip file: {0}")]
    Archive(#[from] ArchiveError),

    /// The archive holds no file entries.
    #[error("no files in zip {location}")]
    Empty { location: String },
}
