//! fsplit-chunks: fixed-size file splitting and checksum-verified reassembly
//!
//! # Overview
//! - `checksum`: streaming MD5 over the whole source (integrity only)
//! - `naming`: `<name>_<index>-<total>.chunk` names and `header.json`
//! - `manifest`: the JSON header tying a split directory together
//! - `splitter`: source file → chunk files + manifest
//! - `joiner`: chunk files + manifest → verified original, then cleanup

use std::path::{Path, PathBuf};

use fsplit_core::{FsplitError, FsplitResult};

pub mod checksum;
pub mod joiner;
pub mod manifest;
pub mod naming;
pub mod splitter;

// Convenience re-exports for the most common operations
pub use checksum::{hash_bytes, hash_file_streaming, ContentHasher};
pub use joiner::{join_dir, JoinResult};
pub use manifest::Manifest;
pub use naming::{ChunkName, MANIFEST_FILE_NAME};
pub use splitter::{split_file, SplitResult};

/// Progress callback type (done, total, message)
pub type ProgressFn = Box<dyn Fn(u64, u64, &str) + Send + Sync>;

/// Use `dir` or fall back to the current directory, creating it if needed.
pub(crate) fn resolve_output_dir(dir: Option<&Path>) -> FsplitResult<PathBuf> {
    let dir = match dir {
        Some(d) => d.to_path_buf(),
        None => std::env::current_dir()
            .map_err(FsplitError::io("resolving current directory", Path::new(".")))?,
    };
    std::fs::create_dir_all(&dir).map_err(FsplitError::io("creating output directory", &dir))?;
    Ok(dir)
}
