//! Splitter: stream a source file into ordered, bounded-size chunk files.
//!
//! The source is read sequentially in `read_block_size` blocks. Each block
//! goes both into the running whole-file checksum and into the chunk file
//! currently open; a chunk is closed once it holds `chunk_ceiling` bytes or
//! the source is exhausted. The manifest is written last.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use fsplit_core::{ChunkLimits, FsplitError, FsplitResult};

use crate::checksum::ContentHasher;
use crate::manifest::Manifest;
use crate::naming::{self, MANIFEST_FILE_NAME};
use crate::{resolve_output_dir, ProgressFn};

/// Result of splitting a single file
#[derive(Debug)]
pub struct SplitResult {
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
    /// Chunk paths in sequence order
    pub chunk_paths: Vec<PathBuf>,
    /// Bytes read from the source
    pub bytes: u64,
}

/// Split `input` into chunk files plus `header.json` inside `output_dir`
/// (current directory when `None`).
///
/// A failed split may leave already-written chunks behind; they are not
/// cleaned up.
pub fn split_file(
    input: &Path,
    output_dir: Option<&Path>,
    limits: &ChunkLimits,
    progress: Option<&ProgressFn>,
) -> FsplitResult<SplitResult> {
    let limits = ChunkLimits::new(limits.chunk_ceiling, limits.read_block_size)?;
    let name = source_file_name(input)?;
    let output_dir = resolve_output_dir(output_dir)?;

    let source = File::open(input).map_err(FsplitError::io("opening input", input))?;
    let metadata = source
        .metadata()
        .map_err(FsplitError::io("reading metadata", input))?;
    if !metadata.is_file() {
        return Err(FsplitError::InvalidInput(format!(
            "not a regular file: {}",
            input.display()
        )));
    }

    let file_size = metadata.len();
    let total = limits.chunk_count(file_size);
    reject_overwrite_of_input(input, &output_dir, &name, total)?;
    debug!(
        input = %input.display(),
        file_size,
        chunks = total,
        ceiling = limits.chunk_ceiling,
        "splitting"
    );

    let mut reader = source;
    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; limits.read_block_size];
    let mut chunk_paths = Vec::with_capacity(total as usize);
    let mut done: u64 = 0;

    for chunk in naming::chunk_names(&name, total) {
        let path = chunk.path_in(&output_dir);
        let written = write_chunk(
            &mut reader,
            &path,
            limits.chunk_ceiling,
            &mut buf,
            &mut hasher,
            input,
        )?;
        done += written;
        debug!(chunk = %chunk, bytes = written, "chunk written");

        if let Some(cb) = progress {
            cb(done, file_size, &format!("chunk {}/{total}", chunk.index));
        }
        chunk_paths.push(path);
    }

    // Every chunk is full only if the source grew after we sized it.
    if read_block(&mut reader, &mut buf[..1], input)? != 0 {
        return Err(FsplitError::InvalidInput(format!(
            "{} grew while being split (expected {file_size} bytes)",
            input.display()
        )));
    }

    let manifest = Manifest {
        name,
        checksum: hasher.finalize_hex(),
        chunk_count: total,
    };
    let manifest_path = manifest.write_to(&output_dir)?;

    info!(
        input = %input.display(),
        output = %output_dir.display(),
        bytes = done,
        chunks = total,
        md5 = %manifest.checksum,
        "split complete"
    );

    Ok(SplitResult {
        manifest,
        manifest_path,
        chunk_paths,
        bytes: done,
    })
}

/// Fill one chunk file with up to `ceiling` bytes from `reader`.
///
/// The chunk is created with truncation, so a stale file of the same name is
/// replaced rather than appended to.
fn write_chunk(
    reader: &mut impl Read,
    path: &Path,
    ceiling: u64,
    buf: &mut [u8],
    hasher: &mut ContentHasher,
    input: &Path,
) -> FsplitResult<u64> {
    let file = File::create(path).map_err(FsplitError::io("creating chunk", path))?;
    let mut writer = BufWriter::new(file);
    let mut remaining = ceiling;

    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = read_block(reader, &mut buf[..want], input)?;
        if n == 0 {
            break;
        }
        writer
            .write_all(&buf[..n])
            .map_err(FsplitError::io("writing chunk", path))?;
        hasher.update(&buf[..n]);
        remaining -= n as u64;
    }

    writer.flush().map_err(FsplitError::io("flushing chunk", path))?;
    Ok(ceiling - remaining)
}

/// One `read` call, retried on `Interrupted`. Returns 0 at end of input.
fn read_block(reader: &mut impl Read, buf: &mut [u8], input: &Path) -> FsplitResult<usize> {
    loop {
        match reader.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FsplitError::io("reading input", input)(e)),
        }
    }
}

/// Fail if any file this split would write (chunks, manifest or its temp
/// file) is the input itself, reached directly or through a link.
fn reject_overwrite_of_input(
    input: &Path,
    output_dir: &Path,
    name: &str,
    total: u64,
) -> FsplitResult<()> {
    let source = input
        .canonicalize()
        .map_err(FsplitError::io("resolving input", input))?;
    let dir = output_dir
        .canonicalize()
        .map_err(FsplitError::io("resolving output directory", output_dir))?;

    let manifest = Manifest::path_in(&dir);
    let manifest_tmp = dir.join(format!("{MANIFEST_FILE_NAME}.tmp"));
    let targets = [manifest, manifest_tmp]
        .into_iter()
        .chain(naming::chunk_names(name, total).map(|chunk| chunk.path_in(&dir)));

    for target in targets {
        // a target that doesn't exist yet can't be the input
        let same = match target.canonicalize() {
            Ok(resolved) => resolved == source,
            Err(_) => false,
        };
        if same {
            return Err(FsplitError::InvalidInput(format!(
                "{} would be overwritten by its own split output",
                input.display()
            )));
        }
    }
    Ok(())
}

/// Base name recorded in the manifest and embedded in chunk names.
fn source_file_name(input: &Path) -> FsplitResult<String> {
    let name = input.file_name().ok_or_else(|| {
        FsplitError::InvalidInput(format!("no file name in path: {}", input.display()))
    })?;
    name.to_str().map(str::to_string).ok_or_else(|| {
        FsplitError::InvalidInput(format!("file name is not UTF-8: {}", input.display()))
    })
}
