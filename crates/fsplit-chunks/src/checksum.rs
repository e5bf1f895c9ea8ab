//! MD5 whole-file checksums
//!
//! The digest is the integrity check recorded in the manifest: 128 bits,
//! rendered as 32 lowercase hex chars. Chunks carry no checksum of their own.

use md5::{Digest, Md5};
use std::io::Read;
use std::path::Path;

use fsplit_core::{FsplitError, FsplitResult};

/// Length of a hex-encoded digest
pub const HEX_LEN: usize = 32;

/// Running checksum fed block by block while a file streams through.
#[derive(Clone, Default)]
pub struct ContentHasher {
    inner: Md5,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Consume the hasher and return the lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        format!("{:x}", self.inner.finalize())
    }
}

/// Hash a byte slice in memory.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = ContentHasher::new();
    hasher.update(data);
    hasher.finalize_hex()
}

/// Hash a file using the streaming interface.
pub fn hash_file_streaming(path: &Path) -> FsplitResult<String> {
    let mut file =
        std::fs::File::open(path).map_err(FsplitError::io("opening file for hashing", path))?;

    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; 64 * 1024]; // 64KB read buffer

    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FsplitError::io("reading for hash", path)(e)),
        };
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize_hex())
}

/// True if `hex` looks like a digest this module produces.
pub fn is_valid_hex(hex: &str) -> bool {
    hex.len() == HEX_LEN
        && hex
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
