//! Windowed, asynchronous decoding of archive entries around a focus index.

mod asset;
mod window;

pub use asset::{AssetState, AsyncAsset};
pub use window::{DEFAULT_RADIUS, EntryDecoder, PrefetchWindow, WindowConfig};
