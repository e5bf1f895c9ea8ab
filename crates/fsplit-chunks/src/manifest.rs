//! Split manifest: the `header.json` record shared by splitter and joiner.
//!
//! Wire form is a JSON object `{"name": ..., "md5": ..., "length": ...}`.
//! The chunk count is always present; the readers also accept the
//! `checksum` / `chunkCount` spellings for the two value fields.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use fsplit_core::{FsplitError, FsplitResult};

use crate::checksum;
use crate::naming::{self, ChunkName, MANIFEST_FILE_NAME};

/// Header describing one split file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Base name of the original file
    pub name: String,
    /// Lowercase hex MD5 of the complete original content
    #[serde(rename = "md5", alias = "checksum")]
    pub checksum: String,
    /// Number of chunk files
    #[serde(rename = "length", alias = "chunkCount")]
    pub chunk_count: u64,
}

impl Manifest {
    /// Parse and validate manifest bytes.
    pub fn from_bytes(data: &[u8]) -> FsplitResult<Self> {
        let manifest: Manifest = serde_json::from_slice(data)
            .map_err(|e| FsplitError::Manifest(format!("invalid JSON: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Serialize manifest to JSON bytes.
    pub fn to_bytes(&self) -> FsplitResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| FsplitError::Manifest(format!("serializing manifest: {e}")))
    }

    /// Reject records the joiner could not act on safely.
    pub fn validate(&self) -> FsplitResult<()> {
        if !is_plain_file_name(&self.name) {
            return Err(FsplitError::Manifest(format!(
                "name must be a single file name, got {:?}",
                self.name
            )));
        }
        if !checksum::is_valid_hex(&self.checksum) {
            return Err(FsplitError::Manifest(format!(
                "md5 must be {} lowercase hex chars, got {:?}",
                checksum::HEX_LEN,
                self.checksum
            )));
        }
        if self.chunk_count == 0 {
            return Err(FsplitError::Manifest("length must be at least 1".into()));
        }
        Ok(())
    }

    /// Path of the manifest inside `dir`.
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE_NAME)
    }

    /// Read `header.json` from `dir`.
    pub fn read_from(dir: &Path) -> FsplitResult<Self> {
        let path = Self::path_in(dir);
        let data = std::fs::read(&path).map_err(FsplitError::io("reading manifest", &path))?;
        Self::from_bytes(&data).map_err(|e| match e {
            FsplitError::Manifest(msg) => {
                FsplitError::Manifest(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Write `header.json` into `dir` via temp file + rename, so a reader
    /// never observes a half-written manifest.
    pub fn write_to(&self, dir: &Path) -> FsplitResult<PathBuf> {
        let path = Self::path_in(dir);
        let tmp = dir.join(format!("{MANIFEST_FILE_NAME}.tmp"));
        std::fs::write(&tmp, self.to_bytes()?)
            .map_err(FsplitError::io("writing manifest", &tmp))?;
        std::fs::rename(&tmp, &path).map_err(FsplitError::io("renaming manifest", &path))?;
        Ok(path)
    }

    /// Chunk names in sequence order.
    pub fn chunk_names(&self) -> impl Iterator<Item = ChunkName> + '_ {
        naming::chunk_names(&self.name, self.chunk_count)
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";

    fn sample() -> Manifest {
        Manifest {
            name: "movie.mkv".into(),
            checksum: EMPTY_MD5.into(),
            chunk_count: 3,
        }
    }

    #[test]
    fn serializes_with_wire_keys() {
        let json: serde_json::Value =
            serde_json::from_slice(&sample().to_bytes().unwrap()).unwrap();
        assert_eq!(json["name"], "movie.mkv");
        assert_eq!(json["md5"], EMPTY_MD5);
        assert_eq!(json["length"], 3);
        assert_eq!(json.as_object().unwrap().len(), 3);
    }

    #[test]
    fn parses_header_written_with_spaces() {
        let header = format!(r#"{{"name": "movie.mkv", "md5": "{EMPTY_MD5}", "length": 3}}"#);
        assert_eq!(Manifest::from_bytes(header.as_bytes()).unwrap(), sample());
    }

    #[test]
    fn accepts_alias_keys() {
        let header =
            format!(r#"{{"name": "movie.mkv", "checksum": "{EMPTY_MD5}", "chunkCount": 3}}"#);
        assert_eq!(Manifest::from_bytes(header.as_bytes()).unwrap(), sample());
    }

    #[test]
    fn chunk_count_is_required() {
        let header = format!(r#"{{"name": "movie.mkv", "md5": "{EMPTY_MD5}"}}"#);
        assert!(matches!(
            Manifest::from_bytes(header.as_bytes()),
            Err(FsplitError::Manifest(_))
        ));
    }

    #[test]
    fn rejects_invalid_fields() {
        let mut m = sample();
        m.chunk_count = 0;
        assert!(m.validate().is_err());

        let mut m = sample();
        m.checksum = "not-a-digest".into();
        assert!(m.validate().is_err());

        for name in ["", ".", "..", "../evil", "dir/file", "/abs", "a\\b"] {
            let mut m = sample();
            m.name = name.into();
            assert!(m.validate().is_err(), "accepted name {name:?}");
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(Manifest::from_bytes(b"").is_err());
        assert!(Manifest::from_bytes(b"[1, 2, 3]").is_err());
    }

    #[test]
    fn write_then_read() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = sample().write_to(tmp.path()).unwrap();

        assert_eq!(path, tmp.path().join("header.json"));
        assert!(!tmp.path().join("header.json.tmp").exists());
        assert_eq!(Manifest::read_from(tmp.path()).unwrap(), sample());
    }

    #[test]
    fn read_missing_is_io_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            Manifest::read_from(tmp.path()),
            Err(FsplitError::Io { .. })
        ));
    }

    #[test]
    fn chunk_names_follow_manifest() {
        let names: Vec<String> = sample().chunk_names().map(|c| c.to_string()).collect();
        assert_eq!(
            names,
            ["movie.mkv_1-3.chunk", "movie.mkv_2-3.chunk", "movie.mkv_3-3.chunk"]
        );
    }
}
