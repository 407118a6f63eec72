//! Error types for the counting engine

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to memory-map {}: {source}", path.display())]
    Map {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed record at byte {offset}: {reason} ({line:?})")]
    Malformed {
        offset: usize,
        line: String,
        reason: Malformation,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

impl Error {
    pub(crate) fn malformed(offset: usize, line: &[u8], reason: Malformation) -> Self {
        Error::Malformed {
            offset,
            line: String::from_utf8_lossy(line).into_owned(),
            reason,
        }
    }
}

/// Why a record does not match the dotted-quad grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Malformation {
    #[error("record is {0} bytes long, at most 15 allowed")]
    TooLong(usize),

    #[error("expected 4 fields, found {0}")]
    FieldCount(usize),

    #[error("empty field")]
    EmptyField,

    #[error("field has more than 3 digits")]
    FieldTooWide,

    #[error("unexpected byte 0x{0:02x}")]
    InvalidByte(u8),
}

pub type Result<T> = std::result::Result<T, Error>;
