//! Chunk and manifest file names
//!
//! A chunk is named `<name>_<index>-<total>.chunk` with a 1-based index, so
//! its position is recoverable from the name alone and never depends on
//! directory listing order.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use fsplit_core::FsplitError;

/// File name of the manifest inside a split directory
pub const MANIFEST_FILE_NAME: &str = "header.json";

/// Extension carried by every chunk file
pub const CHUNK_EXTENSION: &str = "chunk";

/// Parsed form of a chunk file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkName {
    /// Base name of the original file
    pub name: String,
    /// 1-based position in the sequence
    pub index: u64,
    /// Chunk count of the whole split
    pub total: u64,
}

impl ChunkName {
    pub fn new(name: impl Into<String>, index: u64, total: u64) -> Self {
        Self {
            name: name.into(),
            index,
            total,
        }
    }

    /// Full path of this chunk inside `dir`.
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.to_string())
    }
}

impl fmt::Display for ChunkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}-{}.{CHUNK_EXTENSION}",
            self.name, self.index, self.total
        )
    }
}

impl FromStr for ChunkName {
    type Err = FsplitError;

    /// Splits on the last `_`, so original names may contain `_` and `-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FsplitError::InvalidInput(format!("not a chunk file name: {s}"));

        let stem = s
            .strip_suffix(CHUNK_EXTENSION)
            .and_then(|rest| rest.strip_suffix('.'))
            .ok_or_else(invalid)?;
        let (name, position) = stem.rsplit_once('_').ok_or_else(invalid)?;
        let (index, total) = position.split_once('-').ok_or_else(invalid)?;

        let digits = |v: &str| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit());
        if name.is_empty() || !digits(index) || !digits(total) {
            return Err(invalid());
        }

        let index: u64 = index.parse().map_err(|_| invalid())?;
        let total: u64 = total.parse().map_err(|_| invalid())?;
        if index == 0 || index > total {
            return Err(invalid());
        }

        Ok(ChunkName::new(name, index, total))
    }
}

/// Ordered names of every chunk belonging to `name`.
pub fn chunk_names(name: &str, total: u64) -> impl Iterator<Item = ChunkName> + '_ {
    (1..=total).map(move |index| ChunkName::new(name, index, total))
}
