//! Archive builder on top of Info-ZIP `zip`

use crate::core::error::{PackError, PackResult, PipelineError, ResultExt};
use crate::pack::locator::SourceSet;
use crate::pack::tool::tool_cmd;
use crate::utils::remove_file_best_effort;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// How entries are named inside the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveLayout {
  /// Paths relative to the source root (single-bundle mode)
  Relative,
  /// Bare file names, no directories (per-group mode)
  Flat,
}

/// Absolute form of a path whose parent exists
fn absolute(path: &Path) -> PackResult<PathBuf> {
  let parent = match path.parent() {
    Some(p) if !p.as_os_str().is_empty() => p.canonicalize()?,
    _ => std::env::current_dir()?,
  };
  let name = path
    .file_name()
    .ok_or_else(|| PackError::message(format!("Invalid archive path: {}", path.display())))?;
  Ok(parent.join(name))
}

/// Build `archive` from `sources`
///
/// Entry order follows the source set. Any previous archive at the same path
/// is removed first so `zip` never appends to stale content. `-X` drops extra
/// file attributes (uid/gid, extended timestamps) so unchanged inputs produce
/// identical bytes.
pub fn build_archive(sources: &SourceSet, archive: &Path, layout: ArchiveLayout) -> PackResult<()> {
  if sources.is_empty() {
    return Err(
      PipelineError::EmptySource {
        root: sources.root.clone(),
        wanted: "files to archive".to_string(),
      }
      .into(),
    );
  }
  let archive = absolute(archive)?;
  remove_file_best_effort(&archive).with_context(|| format!("Failed to remove stale {}", archive.display()))?;

  let names: Vec<PathBuf> = match layout {
    ArchiveLayout::Relative => sources.relative_paths(),
    ArchiveLayout::Flat => sources.files.clone(),
  };

  let mut cmd = tool_cmd("zip", Some(&sources.root));
  cmd.args(["-X", "-q"]);
  if layout == ArchiveLayout::Flat {
    cmd.arg("-j");
  }
  // Names are read from stdin, one per line
  cmd.arg(&archive).arg("-@");

  tracing::debug!(archive = %archive.display(), entries = names.len(), ?layout, "running zip");

  let mut child = cmd
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .context("Failed to run zip")?;

  if let Some(mut stdin) = child.stdin.take() {
    for name in &names {
      writeln!(stdin, "{}", name.display()).context("Failed to pass file list to zip")?;
    }
  }

  let output = child.wait_with_output().context("Failed to wait for zip")?;
  if !output.status.success() {
    return Err(
      PipelineError::ArchiveBuild {
        archive,
        status: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }
      .into(),
    );
  }

  Ok(())
}

/// Entry names stored in a zip archive, via `unzip -Z1`
#[cfg(test)]
pub(crate) fn list_entries(archive: &Path) -> Vec<String> {
  let output = std::process::Command::new("unzip").arg("-Z1").arg(archive).output().unwrap();
  assert!(output.status.success());
  String::from_utf8_lossy(&output.stdout).lines().map(String::from).collect()
}
