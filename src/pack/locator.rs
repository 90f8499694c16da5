//! Asset discovery under a source root
//!
//! Single-bundle mode walks the whole tree for a fixed set of extensions.
//! Per-group mode looks only at the top level for `<key>_<index>.<ext>` frames.

use crate::core::error::{PackResult, PipelineError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Files selected for one bundle, in enumeration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
  /// Source root the files were drawn from (absolute)
  pub root: PathBuf,
  /// Absolute file paths
  pub files: Vec<PathBuf>,
}

impl SourceSet {
  /// Paths relative to the source root, in enumeration order
  pub fn relative_paths(&self) -> Vec<PathBuf> {
    self
      .files
      .iter()
      .map(|f| f.strip_prefix(&self.root).map(Path::to_path_buf).unwrap_or_else(|_| f.clone()))
      .collect()
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }
}

/// Group key -> frames, keys in sorted order
///
/// A key can map to an empty frame list when only non-frame files carried it
/// (`pet2_cover.png`); the orchestrator skips those groups.
#[derive(Debug, Clone, Default)]
pub struct GroupSet {
  pub root: PathBuf,
  pub groups: BTreeMap<String, Vec<PathBuf>>,
}

impl GroupSet {
  /// Source set for one group (empty when the key is unknown)
  pub fn source_set(&self, key: &str) -> SourceSet {
    SourceSet {
      root: self.root.clone(),
      files: self.groups.get(key).cloned().unwrap_or_default(),
    }
  }
}

fn check_root(root: &Path) -> PackResult<PathBuf> {
  if !root.is_dir() {
    return Err(
      PipelineError::SourceNotFound {
        root: root.to_path_buf(),
      }
      .into(),
    );
  }
  Ok(root.canonicalize()?)
}

fn is_hidden(entry: &DirEntry) -> bool {
  entry.depth() > 0 && entry.file_name().to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| extensions.iter().any(|want| want.eq_ignore_ascii_case(e)))
    .unwrap_or(false)
}

/// Every regular file under `root` whose extension is in `extensions`
///
/// Hidden files and directories are skipped. Fails with `EmptySource` when
/// nothing matches.
pub fn locate_bundle(root: &Path, extensions: &[String]) -> PackResult<SourceSet> {
  let root = check_root(root)?;

  let mut files = Vec::new();
  for entry in WalkDir::new(&root)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|e| !is_hidden(e))
  {
    let entry = entry?;
    if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
      files.push(entry.into_path());
    }
  }

  if files.is_empty() {
    let wanted = extensions.iter().map(|e| format!("*.{}", e)).collect::<Vec<_>>().join(", ");
    return Err(PipelineError::EmptySource { root, wanted }.into());
  }

  tracing::debug!(count = files.len(), root = %root.display(), "located bundle sources");
  Ok(SourceSet { root, files })
}

/// Split a file stem into `(key, index)` at the first underscore
///
/// `index` is `None` when the remainder is not a plain decimal number.
pub fn split_group_stem(stem: &str) -> Option<(&str, Option<u64>)> {
  let (key, rest) = stem.split_once('_')?;
  if key.is_empty() {
    return None;
  }
  let index = if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
    rest.parse().ok()
  } else {
    None
  };
  Some((key, index))
}

/// Top-level `<key>_<index>.<ext>` frames grouped by key
///
/// Frames within a group are ordered by numeric index. Fails with
/// `EmptySource` when no key is found at all.
pub fn locate_groups(root: &Path, extension: &str) -> PackResult<GroupSet> {
  let root = check_root(root)?;
  let extensions = [extension.to_string()];

  let mut indexed: BTreeMap<String, Vec<(u64, PathBuf)>> = BTreeMap::new();
  for entry in WalkDir::new(&root).min_depth(1).max_depth(1).sort_by_file_name() {
    let entry = entry?;
    let path = entry.path();
    if !entry.file_type().is_file() || !has_extension(path, &extensions) {
      continue;
    }
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
      continue;
    };
    let Some((key, index)) = split_group_stem(stem) else {
      continue;
    };

    let frames = indexed.entry(key.to_string()).or_default();
    if let Some(index) = index {
      frames.push((index, entry.path().to_path_buf()));
    }
  }

  if indexed.is_empty() {
    return Err(
      PipelineError::EmptySource {
        root,
        wanted: format!("<name>_<n>.{} groups", extension),
      }
      .into(),
    );
  }

  let groups = indexed
    .into_iter()
    .map(|(key, mut frames)| {
      frames.sort();
      (key, frames.into_iter().map(|(_, p)| p).collect())
    })
    .collect();

  Ok(GroupSet { root, groups })
}
