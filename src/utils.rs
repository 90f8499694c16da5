//! Small helpers shared across the pipeline

use std::io;
use std::path::{Path, PathBuf};

/// Convert a path to Git format (always forward slashes)
///
/// Git expects paths with forward slashes, even on Windows.
pub fn path_to_git_format(path: &Path) -> String {
  #[cfg(target_os = "windows")]
  {
    path.to_string_lossy().replace('\\', "/")
  }
  #[cfg(not(target_os = "windows"))]
  {
    path.to_string_lossy().to_string()
  }
}

/// Byte count as megabytes with two decimals (`1048576` -> `"1.00"`)
pub fn format_megabytes(bytes: u64) -> String {
  format!("{:.2}", bytes as f64 / (1024.0 * 1024.0))
}

/// Remove a file, treating "already gone" as success
pub fn remove_file_best_effort(path: &Path) -> io::Result<()> {
  match std::fs::remove_file(path) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(e),
  }
}

/// Removes a file when dropped unless `keep` is called first
///
/// Holds intermediate outputs: the plaintext archive, staged artifact and
/// staged manifest of a bundle.
pub struct RemoveOnDrop {
  path: Option<PathBuf>,
}

impl RemoveOnDrop {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: Some(path.into()),
    }
  }

  pub fn path(&self) -> &Path {
    self.path.as_deref().unwrap_or(Path::new(""))
  }

  /// Leave the file in place; returns its path
  pub fn keep(mut self) -> PathBuf {
    self.path.take().unwrap_or_default()
  }
}

impl Drop for RemoveOnDrop {
  fn drop(&mut self) {
    if let Some(path) = self.path.take()
      && let Err(e) = remove_file_best_effort(&path)
    {
      tracing::warn!(path = %path.display(), error = %e, "failed to clean up intermediate file");
    }
  }
}
