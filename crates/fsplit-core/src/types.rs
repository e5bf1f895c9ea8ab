use serde::{Deserialize, Serialize};

use crate::error::{FsplitError, FsplitResult};

const MIB: u64 = 1024 * 1024;

/// Named chunk-size presets selectable from the CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkProfile {
    /// 8 MiB chunks
    #[default]
    Standard,
    /// 50 MiB chunks (`--nitro`)
    HighThroughput,
}

/// Size bounds handed to the splitter and joiner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLimits {
    /// Maximum bytes per chunk file. The last chunk may be shorter.
    pub chunk_ceiling: u64,
    /// Buffer size for each read; independent of the ceiling.
    pub read_block_size: usize,
}

impl ChunkLimits {
    /// Default read granularity: 1 MiB
    pub const DEFAULT_READ_BLOCK: usize = MIB as usize;

    pub const STANDARD: ChunkLimits = ChunkLimits {
        chunk_ceiling: 8 * MIB,
        read_block_size: Self::DEFAULT_READ_BLOCK,
    };

    pub const HIGH_THROUGHPUT: ChunkLimits = ChunkLimits {
        chunk_ceiling: 50 * MIB,
        read_block_size: Self::DEFAULT_READ_BLOCK,
    };

    /// Build limits, rejecting zero sizes.
    pub fn new(chunk_ceiling: u64, read_block_size: usize) -> FsplitResult<Self> {
        if chunk_ceiling == 0 {
            return Err(FsplitError::Config("chunk ceiling must be > 0".into()));
        }
        if read_block_size == 0 {
            return Err(FsplitError::Config("read block size must be > 0".into()));
        }
        Ok(Self {
            chunk_ceiling,
            read_block_size,
        })
    }

    pub fn for_profile(profile: ChunkProfile) -> Self {
        match profile {
            ChunkProfile::Standard => Self::STANDARD,
            ChunkProfile::HighThroughput => Self::HIGH_THROUGHPUT,
        }
    }

    /// Number of chunk files a source of `file_size` bytes is split into.
    ///
    /// Integer division plus one: an empty file still gets one (empty) chunk,
    /// and a size that is an exact multiple of the ceiling gets a trailing
    /// empty chunk.
    pub fn chunk_count(&self, file_size: u64) -> u64 {
        file_size / self.chunk_ceiling + 1
    }
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self::STANDARD
    }
}
