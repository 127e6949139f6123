use clap::Parser;
use clap::builder::RangedU64ValueParser;
use std::time::Duration;

use crate::config::Config;
use crate::io::{CHUNK_SIZE, MAX_CHUNKS};
use crate::prefetch::DEFAULT_RADIUS;
use crate::session::is_http_url;

#[derive(Parser, Debug)]
#[command(name = "zipwindow")]
#[command(version)]
#[command(about = "Step through a (remote) ZIP archive in natural order", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipwindow https://example.com/comic.zip          walk every page, prefetching neighbours\n  \
  zipwindow -l https://example.com/comic.zip       list pages in natural order\n  \
  zipwindow -s 10 -c 1 -p comic.zip > page10.png   write the 10th page to a file\n  \
  RUST_LOG=zipwindow=debug zipwindow comic.zip     show fetches and prefetch decisions")]
pub struct Cli {
    /// ZIP file path or HTTP URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// List entries in natural order (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely: sizes and compression method
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Start at entry N (1-based)
    #[arg(short = 's', value_name = "N", default_value_t = 1, value_parser = at_least_one())]
    pub start: usize,

    /// Visit at most N entries
    #[arg(short = 'c', value_name = "N", value_parser = at_least_one())]
    pub count: Option<usize>,

    /// Walk backwards from the start entry
    #[arg(short = 'r')]
    pub reverse: bool,

    /// Print each visited entry as a data: URI
    #[arg(long)]
    pub data_url: bool,

    /// Write raw entry contents to stdout, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Per-request timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Cache chunk size in bytes
    #[arg(long, value_name = "BYTES", default_value_t = CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Maximum number of cached chunks
    #[arg(long, value_name = "N", default_value_t = MAX_CHUNKS)]
    pub max_chunks: usize,

    /// Entries kept decoded on each side of the current one
    #[arg(long, value_name = "N", default_value_t = DEFAULT_RADIUS)]
    pub radius: usize,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

fn at_least_one() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::new().range(1..)
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        is_http_url(&self.file)
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Default log level for this crate, before `RUST_LOG` is consulted.
    pub fn log_level(&self) -> &'static str {
        if self.is_very_quiet() {
            "error"
        } else {
            "warn"
        }
    }

    /// Zero-based start index.
    pub fn start_index(&self) -> usize {
        self.start.saturating_sub(1)
    }

    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.http.timeout = (self.timeout > 0).then(|| Duration::from_secs(self.timeout));
        config.cache.chunk_size = self.chunk_size;
        config.cache.max_chunks = self.max_chunks;
        config.window.radius = self.radius;
        config
    }
}
