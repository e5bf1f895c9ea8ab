use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{FsplitError, FsplitResult};
use crate::types::{ChunkLimits, ChunkProfile};

/// Top-level configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FsplitConfig {
    pub chunking: ChunkingConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Profile used when the CLI does not ask for one (default: standard)
    pub profile: ChunkProfile,
    /// Bytes read per I/O call (default: 1 MiB)
    pub read_block_size: usize,
    /// Chunk ceiling for the standard profile (default: 8 MiB)
    pub standard_ceiling: u64,
    /// Chunk ceiling for the high-throughput profile (default: 50 MiB)
    pub high_throughput_ceiling: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level or EnvFilter directive (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            profile: ChunkProfile::Standard,
            read_block_size: ChunkLimits::DEFAULT_READ_BLOCK,
            standard_ceiling: ChunkLimits::STANDARD.chunk_ceiling,
            high_throughput_ceiling: ChunkLimits::HIGH_THROUGHPUT.chunk_ceiling,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl FsplitConfig {
    /// Read and parse a TOML config file.
    pub fn from_file(path: &Path) -> FsplitResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(FsplitError::io("reading config", path))?;
        toml::from_str(&content)
            .map_err(|e| FsplitError::Config(format!("parsing {}: {e}", path.display())))
    }

    /// Resolve validated limits for `profile`.
    pub fn limits(&self, profile: ChunkProfile) -> FsplitResult<ChunkLimits> {
        let ceiling = match profile {
            ChunkProfile::Standard => self.chunking.standard_ceiling,
            ChunkProfile::HighThroughput => self.chunking.high_throughput_ceiling,
        };
        ChunkLimits::new(ceiling, self.chunking.read_block_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[chunking]
profile = "high-throughput"
read_block_size = 4096
standard_ceiling = 65536
high_throughput_ceiling = 1048576

[log]
level = "debug"
format = "json"
"#;
        let config: FsplitConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.chunking.profile, ChunkProfile::HighThroughput);
        assert_eq!(config.chunking.read_block_size, 4096);
        assert_eq!(config.chunking.standard_ceiling, 65536);
        assert_eq!(config.chunking.high_throughput_ceiling, 1048576);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");

        let limits = config.limits(ChunkProfile::Standard).unwrap();
        assert_eq!(limits.chunk_ceiling, 65536);
        assert_eq!(limits.read_block_size, 4096);
    }

    #[test]
    fn test_parse_defaults() {
        let config: FsplitConfig = toml::from_str("").unwrap();

        assert_eq!(config.chunking.profile, ChunkProfile::Standard);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, "text");
        assert_eq!(
            config.limits(ChunkProfile::Standard).unwrap(),
            ChunkLimits::STANDARD
        );
        assert_eq!(
            config.limits(ChunkProfile::HighThroughput).unwrap(),
            ChunkLimits::HIGH_THROUGHPUT
        );
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[chunking]
standard_ceiling = 4194304
"#;
        let config: FsplitConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.chunking.standard_ceiling, 4194304);
        // Defaults
        assert_eq!(config.chunking.read_block_size, 1024 * 1024);
        assert_eq!(config.chunking.high_throughput_ceiling, 50 * 1024 * 1024);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_zero_ceiling_rejected() {
        let config: FsplitConfig = toml::from_str("[chunking]\nstandard_ceiling = 0\n").unwrap();
        assert!(matches!(
            config.limits(ChunkProfile::Standard),
            Err(FsplitError::Config(_))
        ));
        assert!(config.limits(ChunkProfile::HighThroughput).is_ok());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = FsplitConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: FsplitConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.chunking.profile, parsed.chunking.profile);
        assert_eq!(config.chunking.standard_ceiling, parsed.chunking.standard_ceiling);
        assert_eq!(config.log.format, parsed.log.format);
    }

    #[test]
    fn test_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[log]\nlevel = \"warn\"\n").unwrap();

        let config = FsplitConfig::from_file(&path).unwrap();
        assert_eq!(config.log.level, "warn");

        let missing = FsplitConfig::from_file(&tmp.path().join("nope.toml"));
        assert!(matches!(missing, Err(FsplitError::Io { .. })));

        std::fs::write(&path, "[chunking\n").unwrap();
        assert!(matches!(
            FsplitConfig::from_file(&path),
            Err(FsplitError::Config(_))
        ));
    }
}
