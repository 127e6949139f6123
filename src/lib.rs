//! # zipwindow
//!
//! Bounded-memory random access to ZIP archives on servers that only offer
//! HTTP Range requests, plus a prefetching window that keeps the entries
//! around the one being viewed decoded and ready.
//!
//! The layers, bottom up:
//!
//! - [`HttpRangeReader`] fetches byte spans of a remote object
//! - [`ChunkCacheReader`] puts a fixed-size, capped chunk cache in front of any
//!   [`ReadAt`] source, so the scattered little reads of a directory parser
//!   turn into a few aligned fetches
//! - [`zip`] parses the archive directory and reads entries over [`ReadAt`]
//! - [`natural`] orders entry names the way people expect (`2` before `10`)
//! - [`PrefetchWindow`] decodes entries around a focus index in the
//!   background and forgets the rest
//! - [`ArchiveSession`] wires all of it together behind a cursor
//!
//! ## Example
//!
//! ```no_run
//! use zipwindow::{ArchiveSession, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut session =
//!         ArchiveSession::open("https://example.com/comic.zip", &Config::default()).await?;
//!
//!     let page = session.current()?.wait().await?;
//!     println!("{} ({})", page.name, page.mime);
//!
//!     while let Some(asset) = session.next() {
//!         let page = asset.wait().await?;
//!         println!("{} ({})", page.name, page.mime);
//!     }
//!     Ok(())
//! }
//! ```

pub mod asset;
pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod natural;
pub mod prefetch;
pub mod session;
pub mod zip;

pub use asset::DisplayAsset;
pub use cli::Cli;
pub use config::Config;
pub use error::{ArchiveError, DecodeError, FetchError, OpenError, SessionError, WindowError};
pub use io::{ChunkCacheReader, HttpRangeReader, LocalFileReader, ReadAt};
pub use natural::{natural_cmp, natural_less};
pub use prefetch::{AssetState, AsyncAsset, EntryDecoder, PrefetchWindow};
pub use session::ArchiveSession;
