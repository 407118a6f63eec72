//! Read-only memory-mapped input.

use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::error::{Error, Result};

/// The whole input file as one byte slice.
///
/// An empty file is never mapped (zero-length mappings are rejected by some
/// platforms) and reads as an empty slice.
pub struct MappedInput {
    map: Option<Mmap>,
}

impl MappedInput {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let len = file
            .metadata()
            .map_err(|source| Error::Open {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        if len == 0 {
            return Ok(Self { map: None });
        }

        // SAFETY: the mapping is read-only; the file must not be truncated
        // while the count runs.
        let map = unsafe { Mmap::map(&file) }.map_err(|source| Error::Map {
            path: path.to_path_buf(),
            source,
        })?;

        #[cfg(unix)]
        if let Err(err) = map.advise(memmap2::Advice::Sequential) {
            debug!(path = %path.display(), %err, "madvise(sequential) failed");
        }

        debug!(path = %path.display(), bytes = len, "mapped input");
        Ok(Self { map: Some(map) })
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Deref for MappedInput {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}
