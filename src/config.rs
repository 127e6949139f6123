use crate::io::{ChunkCacheConfig, HttpConfig};
use crate::prefetch::WindowConfig;

/// Settings for one archive session.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub http: HttpConfig,
    pub cache: ChunkCacheConfig,
    pub window: WindowConfig,
}
