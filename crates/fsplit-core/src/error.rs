use std::path::{Path, PathBuf};
use thiserror::Error;

pub type FsplitResult<T> = Result<T, FsplitError>;

#[derive(Debug, Error)]
pub enum FsplitError {
    #[error("{action} {}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("missing chunk {index} of {total}: {}", .path.display())]
    MissingChunk {
        index: u64,
        total: u64,
        path: PathBuf,
    },

    #[error("output file already exists: {}", .0.display())]
    OutputExists(PathBuf),

    #[error("checksum mismatch: expected {expected}, computed {computed}")]
    ChecksumMismatch { expected: String, computed: String },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FsplitError {
    /// Build a `map_err` adapter that tags an I/O error with what was being
    /// done and to which path.
    pub fn io<'a>(
        action: &'static str,
        path: &'a Path,
    ) -> impl FnOnce(std::io::Error) -> Self + 'a {
        move |source| FsplitError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// True for the integrity failure raised after reassembly.
    pub fn is_checksum_mismatch(&self) -> bool {
        matches!(self, FsplitError::ChecksumMismatch { .. })
    }
}
