//! Parallel counting of distinct IPv4 addresses in newline-delimited text.
//!
//! The input is memory-mapped and split into record-aligned chunks that a
//! pool of scoped worker threads pulls from a shared cursor. Each worker
//! locates records with word-at-a-time delimiter scanning, parses them into
//! packed `u32` addresses and sets the matching bit in a shared
//! [`PresenceBitmap`]. Once all workers are joined the bitmap's popcount is
//! the answer.
//!
//! ```no_run
//! use ipv4_distinct::{count_unique, EngineConfig};
//!
//! let distinct = count_unique("ips.txt", &EngineConfig::default())?;
//! println!("{distinct}");
//! # Ok::<(), ipv4_distinct::Error>(())
//! ```

pub mod bitset;
pub mod chunks;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod input;
pub mod record;
pub mod sample;
pub mod scan;
pub mod swar;
pub mod vector;

use std::path::Path;

pub use bitset::PresenceBitmap;
pub use config::{EngineConfig, ParserKind};
pub use engine::{Engine, Summary};
pub use error::{Error, Malformation, Result};
pub use input::MappedInput;
pub use swar::{FoldParser, SwarParser};
pub use vector::VectorParser;

/// Turns one record into its packed address, first octet in the high byte.
///
/// Implementations assume the record is well formed. Anything else yields
/// an unspecified value, but never a panic or a read past the record.
pub trait LineParser {
    /// Parses the first `len` bytes of a little-endian 16-byte window.
    /// Bytes at and after `len` must be ignored.
    fn parse_window(window: u128, len: usize) -> u32;

    #[inline]
    fn parse_line(line: &[u8]) -> u32 {
        Self::parse_window(scan::read_window(line), line.len())
    }
}

/// Counts the distinct addresses in the file at `path`.
pub fn count_unique(path: impl AsRef<Path>, config: &EngineConfig) -> Result<u64> {
    let summary = Engine::new(config.clone())?.count_file(path)?;
    Ok(summary.distinct)
}
