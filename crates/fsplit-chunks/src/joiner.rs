//! Joiner: reassemble chunk files into the original file and verify it.
//!
//! Chunk order comes from the manifest (`<name>_<i>-<total>.chunk` for
//! `i in 1..=total`), never from directory listing order. On checksum match
//! the chunks and manifest are removed; on mismatch only the reconstructed
//! output is removed and the sources stay for inspection or retry.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use fsplit_core::{ChunkLimits, FsplitError, FsplitResult};

use crate::checksum::ContentHasher;
use crate::manifest::Manifest;
use crate::{resolve_output_dir, ProgressFn};

/// Result of a verified join
#[derive(Debug)]
pub struct JoinResult {
    pub output_path: PathBuf,
    pub bytes: u64,
    /// Verified MD5 of the output
    pub checksum: String,
    pub chunks: u64,
    /// Sources that could not be deleted after verification
    pub cleanup_failures: Vec<PathBuf>,
}

/// Reassemble the split found in `input_dir` into `output_dir` (current
/// directory when `None`).
///
/// Fails with [`FsplitError::MissingChunk`] before creating any output if a
/// chunk is absent, and with [`FsplitError::ChecksumMismatch`] if the
/// reassembled content does not match the manifest.
pub fn join_dir(
    input_dir: &Path,
    output_dir: Option<&Path>,
    limits: &ChunkLimits,
    progress: Option<&ProgressFn>,
) -> FsplitResult<JoinResult> {
    let limits = ChunkLimits::new(limits.chunk_ceiling, limits.read_block_size)?;
    let manifest = Manifest::read_from(input_dir)?;
    let total = manifest.chunk_count;

    // Walked lazily: `length` comes from disk and may be far larger than
    // the chunks actually present.
    if let Some(chunk) = manifest
        .chunk_names()
        .find(|chunk| !chunk.path_in(input_dir).is_file())
    {
        return Err(FsplitError::MissingChunk {
            index: chunk.index,
            total,
            path: chunk.path_in(input_dir),
        });
    }

    let output_dir = resolve_output_dir(output_dir)?;
    let output_path = output_dir.join(&manifest.name);
    let output = OpenOptions::new()
        .append(true)
        .create_new(true)
        .open(&output_path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => FsplitError::OutputExists(output_path.clone()),
            _ => FsplitError::io("creating output", &output_path)(e),
        })?;

    debug!(
        input = %input_dir.display(),
        output = %output_path.display(),
        chunks = total,
        "joining"
    );

    let assembled = append_chunks(output, &output_path, &manifest, input_dir, &limits, progress);
    let (bytes, computed) = match assembled {
        Ok(v) => v,
        Err(e) => {
            remove_output(&output_path);
            return Err(e);
        }
    };

    if computed != manifest.checksum {
        error!(
            output = %output_path.display(),
            expected = %manifest.checksum,
            computed = %computed,
            "checksum mismatch, discarding output"
        );
        remove_output(&output_path);
        return Err(FsplitError::ChecksumMismatch {
            expected: manifest.checksum,
            computed,
        });
    }

    let mut cleanup_failures = Vec::new();
    let manifest_path = Manifest::path_in(input_dir);
    let sources = manifest
        .chunk_names()
        .map(|chunk| chunk.path_in(input_dir))
        .chain(std::iter::once(manifest_path));
    for path in sources {
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), "couldn't delete source file: {e}");
            cleanup_failures.push(path);
        }
    }

    info!(
        output = %output_path.display(),
        bytes,
        chunks = total,
        md5 = %computed,
        "join verified"
    );

    Ok(JoinResult {
        output_path,
        bytes,
        checksum: computed,
        chunks: total,
        cleanup_failures,
    })
}

/// Append every chunk to `output` in order, returning bytes written and the
/// hex checksum. The output handle is flushed and closed before returning.
fn append_chunks(
    output: File,
    output_path: &Path,
    manifest: &Manifest,
    input_dir: &Path,
    limits: &ChunkLimits,
    progress: Option<&ProgressFn>,
) -> FsplitResult<(u64, String)> {
    let total = manifest.chunk_count;
    let mut writer = BufWriter::new(output);
    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; limits.read_block_size];
    let mut bytes: u64 = 0;

    for name in manifest.chunk_names() {
        let path = name.path_in(input_dir);
        let mut chunk = File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FsplitError::MissingChunk {
                index: name.index,
                total,
                path: path.clone(),
            },
            _ => FsplitError::io("opening chunk", &path)(e),
        })?;

        loop {
            let n = match chunk.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FsplitError::io("reading chunk", &path)(e)),
            };
            writer
                .write_all(&buf[..n])
                .map_err(FsplitError::io("writing output", output_path))?;
            hasher.update(&buf[..n]);
            bytes += n as u64;
        }

        if let Some(cb) = progress {
            cb(name.index, total, &format!("chunk {}/{total}", name.index));
        }
    }

    writer
        .flush()
        .map_err(FsplitError::io("flushing output", output_path))?;
    Ok((bytes, hasher.finalize_hex()))
}

fn remove_output(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path = %path.display(), "couldn't delete invalid output file: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::hash_bytes;
    use crate::splitter::split_file;

    fn limits() -> ChunkLimits {
        ChunkLimits::new(100, 32).unwrap()
    }

    fn split_fixture(tmp: &Path, data: &[u8]) -> PathBuf {
        let input = tmp.join("src.bin");
        std::fs::write(&input, data).unwrap();
        let parts = tmp.join("parts");
        split_file(&input, Some(&parts), &limits(), None).unwrap();
        parts
    }

    #[test]
    fn join_restores_and_cleans_up() {
        let tmp = tempfile::TempDir::new().unwrap();
        let data: Vec<u8> = (0u8..=255).cycle().take(350).collect();
        let parts = split_fixture(tmp.path(), &data);
        let out = tmp.path().join("out");

        let result = join_dir(&parts, Some(&out), &limits(), None).unwrap();

        assert_eq!(result.output_path, out.join("src.bin"));
        assert_eq!(result.bytes, 350);
        assert_eq!(result.chunks, 4);
        assert_eq!(result.checksum, hash_bytes(&data));
        assert!(result.cleanup_failures.is_empty());
        assert_eq!(std::fs::read(&result.output_path).unwrap(), data);
        assert_eq!(std::fs::read_dir(&parts).unwrap().count(), 0);
    }

    #[test]
    fn existing_output_is_not_touched() {
        let tmp = tempfile::TempDir::new().unwrap();
        let parts = split_fixture(tmp.path(), b"payload");
        let out = tmp.path().join("out");
        std::fs::create_dir(&out).unwrap();
        std::fs::write(out.join("src.bin"), b"keep me").unwrap();

        let err = join_dir(&parts, Some(&out), &limits(), None).unwrap_err();

        assert!(matches!(err, FsplitError::OutputExists(_)));
        assert_eq!(std::fs::read(out.join("src.bin")).unwrap(), b"keep me");
        assert!(parts.join("header.json").exists());
        assert!(parts.join("src.bin_1-1.chunk").exists());
    }

    #[test]
    fn malformed_manifest_is_reported() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("header.json"), b"{\"name\": \"x\"}").unwrap();

        let err = join_dir(tmp.path(), Some(tmp.path()), &limits(), None).unwrap_err();
        assert!(matches!(err, FsplitError::Manifest(_)));
        assert!(!tmp.path().join("x").exists());
    }

    #[test]
    fn huge_chunk_count_fails_on_first_gap() {
        let tmp = tempfile::TempDir::new().unwrap();
        let total: u64 = 1_000_000_000_000_000_000;
        let manifest = Manifest {
            name: "big.bin".into(),
            checksum: hash_bytes(b"x"),
            chunk_count: total,
        };
        manifest.write_to(tmp.path()).unwrap();
        let first = crate::naming::ChunkName::new("big.bin", 1, total);
        std::fs::write(first.path_in(tmp.path()), b"x").unwrap();
        let out = tmp.path().join("out");

        let err = join_dir(tmp.path(), Some(&out), &limits(), None).unwrap_err();

        match err {
            FsplitError::MissingChunk { index, total: t, path } => {
                assert_eq!(index, 2);
                assert_eq!(t, total);
                assert_eq!(path, tmp.path().join(format!("big.bin_2-{total}.chunk")));
            }
            other => panic!("expected MissingChunk, got {other:?}"),
        }
        assert!(!out.join("big.bin").exists());
        assert!(first.path_in(tmp.path()).exists());
    }

    #[test]
    fn progress_counts_chunks() {
        use std::sync::{Arc, Mutex};

        let tmp = tempfile::TempDir::new().unwrap();
        let parts = split_fixture(tmp.path(), &[9u8; 250]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress: ProgressFn = Box::new(move |done, total, _msg| {
            sink.lock().unwrap().push((done, total));
        });

        let out = tmp.path().join("out");
        join_dir(&parts, Some(&out), &limits(), Some(&progress)).unwrap();
        assert_eq!(*seen.lock().unwrap(), [(1, 3), (2, 3), (3, 3)]);
    }
}
