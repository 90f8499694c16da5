//! SHA-256 digests and sizes for files on disk

use crate::core::error::{PackResult, ResultExt};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Content digest and byte count of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDigest {
  /// Lowercase hex SHA-256
  pub sha256: String,
  pub bytes: u64,
}

impl FileDigest {
  /// Size rendered as megabytes with two decimals
  pub fn megabytes(&self) -> String {
    crate::utils::format_megabytes(self.bytes)
  }
}

/// Hash a file's bytes; streaming, so artifact size does not matter
pub fn digest_file(path: &Path) -> PackResult<FileDigest> {
  let file = File::open(path).with_context(|| format!("Failed to open {} for hashing", path.display()))?;
  let mut reader = BufReader::new(file);
  let mut hasher = Sha256::new();
  let mut buf = [0u8; 64 * 1024];
  let mut bytes = 0u64;

  loop {
    let n = reader
      .read(&mut buf)
      .with_context(|| format!("Failed to read {}", path.display()))?;
    if n == 0 {
      break;
    }
    hasher.update(&buf[..n]);
    bytes += n as u64;
  }

  Ok(FileDigest {
    sha256: hex::encode(hasher.finalize()),
    bytes,
  })
}
