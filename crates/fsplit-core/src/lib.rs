pub mod config;
pub mod error;
pub mod types;

pub use error::{FsplitError, FsplitResult};
pub use types::{ChunkLimits, ChunkProfile};
