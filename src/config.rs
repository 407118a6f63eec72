//! Engine configuration.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Default upper bound on a chunk, 256 MiB.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 256 << 20;

/// Which record parser the workers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserKind {
    /// Scalar SWAR parser, field at a time.
    Scalar,
    /// Vector parser with layout dispatch.
    #[default]
    Vector,
}

impl FromStr for ParserKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "scalar" | "swar" => Ok(ParserKind::Scalar),
            "vector" | "simd" => Ok(ParserKind::Vector),
            other => Err(Error::Config(format!(
                "unknown parser '{other}', expected 'scalar' or 'vector'"
            ))),
        }
    }
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParserKind::Scalar => "scalar",
            ParserKind::Vector => "vector",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Worker threads. Defaults to the number of logical CPUs.
    pub threads: usize,
    /// Upper bound on the nominal chunk size in bytes.
    pub max_chunk_size: usize,
    pub parser: ParserKind,
    /// Reject malformed records instead of counting whatever they parse to.
    pub strict: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get(),
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            parser: ParserKind::default(),
            strict: false,
        }
    }
}

impl EngineConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    pub fn with_parser(mut self, parser: ParserKind) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(Error::Config("thread count must be at least 1".into()));
        }
        if self.max_chunk_size == 0 {
            return Err(Error::Config("chunk size must be at least 1 byte".into()));
        }
        Ok(())
    }
}
