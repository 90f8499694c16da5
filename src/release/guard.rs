//! Publish guard: encrypted artifacts are committed as literal bytes
//!
//! A `filter=lfs` rule covering the artifact extension makes git store a small
//! pointer text instead of the encrypted file. The guard removes such rules,
//! pins a repository-local override, refuses pointer stubs, and re-stages every
//! published path as plain content before committing.
//!
//! ```text
//! Scan -> Scrub -> Stage -> Verify -> Commit -> Push -> Done
//!                    \        \
//!                     `--------`--> Blocked (pointer stub)
//! ```
//!
//! The stub check runs twice: on the working-tree file before anything is
//! staged, and on the blob that actually landed in the index.

use crate::core::error::{PackResult, PipelineError, ResultExt};
use crate::core::vcs::SystemGit;
use crate::pack::digest::FileDigest;
use crate::utils::path_to_git_format;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Leading bytes of every git-lfs pointer file
pub const POINTER_SIGNATURE: &[u8] = b"version https://git-lfs.github";

/// Whether `bytes` begins like an LFS pointer
pub fn is_pointer_stub(bytes: &[u8]) -> bool {
  bytes.starts_with(POINTER_SIGNATURE)
}

fn file_prefix(path: &Path, len: usize) -> PackResult<Vec<u8>> {
  let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
  let mut buf = Vec::with_capacity(len);
  file
    .take(len as u64)
    .read_to_end(&mut buf)
    .with_context(|| format!("Failed to read {}", path.display()))?;
  Ok(buf)
}

/// Guard states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
  Scan,
  Scrub,
  Stage,
  Verify,
  Commit,
  Push,
  Done,
  Blocked,
}

/// One published artifact, listed in the commit body
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactRecord {
  /// File name, e.g. `pet1.zip.enc`
  pub name: String,
  pub digest: FileDigest,
}

/// Paths that must be committed as ordinary content in one run
#[derive(Debug, Clone, Default)]
pub struct PublishSet {
  /// Paths relative to the work tree
  pub paths: Vec<PathBuf>,
  /// Artifacts described in the commit body
  pub artifacts: Vec<ArtifactRecord>,
}

impl PublishSet {
  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }

  /// Commit body: `<name>  sha256=<digest>  size=<MB>MB` per artifact
  pub fn commit_body(&self) -> String {
    self
      .artifacts
      .iter()
      .map(|a| format!("{}  sha256={}  size={}MB", a.name, a.digest.sha256, a.digest.megabytes()))
      .collect::<Vec<_>>()
      .join("\n")
  }
}

/// Result of the push step; never fatal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PushStatus {
  Pushed { remote: String, branch: String },
  NoUpstream,
  Failed { reason: String },
}

/// Result of a publish run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PublishOutcome {
  Committed { sha: String, push: PushStatus },
  /// Nothing differed from HEAD; no commit was made
  NoOp,
}

/// What one scrub pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrubReport {
  /// Attribute files that lost at least one rule
  pub rewritten: Vec<PathBuf>,
  /// Attribute files deleted because nothing was left
  pub deleted: Vec<PathBuf>,
  /// Whether the override line had to be added
  pub override_added: bool,
}

pub struct PublishGuard<'a> {
  git: &'a SystemGit,
  artifact_ext: String,
  state: GuardState,
  /// Tracked attribute files changed by scrubbing, relative to the work tree
  touched: Vec<PathBuf>,
}

impl<'a> PublishGuard<'a> {
  pub fn new(git: &'a SystemGit, artifact_ext: impl Into<String>) -> Self {
    Self {
      git,
      artifact_ext: artifact_ext.into(),
      state: GuardState::Scan,
      touched: Vec::new(),
    }
  }

  #[cfg(test)]
  pub fn state(&self) -> GuardState {
    self.state
  }

  fn enter(&mut self, next: GuardState) {
    tracing::debug!(from = ?self.state, to = ?next, "publish guard");
    self.state = next;
  }

  /// The override line pinned in `.git/info/attributes`
  pub fn override_rule(&self) -> String {
    format!("*.{} -filter -diff -merge -text", self.artifact_ext)
  }

  /// Every attribute file that can route paths through a filter
  pub fn scan(&mut self) -> PackResult<Vec<PathBuf>> {
    self.enter(GuardState::Scan);

    let mut found = Vec::new();
    for entry in WalkDir::new(self.git.work_tree())
      .sort_by_file_name()
      .into_iter()
      .filter_entry(|e| e.file_name() != ".git")
    {
      let entry = entry?;
      if entry.file_type().is_file() && entry.file_name() == ".gitattributes" {
        found.push(entry.into_path());
      }
    }

    let info = self.git.git_dir()?.join("info").join("attributes");
    if info.is_file() {
      found.push(info);
    }
    Ok(found)
  }

  /// Whether an attributes line sends artifact-extension paths through LFS
  pub fn is_lfs_rule_for_artifacts(&self, line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
      return false;
    }
    let mut tokens = trimmed.split_whitespace();
    let Some(pattern) = tokens.next() else {
      return false;
    };
    let names_ext = pattern
      .to_ascii_lowercase()
      .ends_with(&format!(".{}", self.artifact_ext.to_ascii_lowercase()));
    let lfs = tokens.any(|attr| attr == "filter=lfs");
    names_ext && lfs
  }

  /// Remove LFS rules for the artifact extension and pin the override
  pub fn scrub(&mut self) -> PackResult<ScrubReport> {
    let files = self.scan()?;
    self.enter(GuardState::Scrub);

    let mut report = ScrubReport::default();
    for file in files {
      let content = fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?;
      // Lines keep their own terminators so CRLF files stay CRLF
      let kept: Vec<&str> = content
        .split_inclusive('\n')
        .filter(|l| !self.is_lfs_rule_for_artifacts(l))
        .collect();
      if kept.len() == content.split_inclusive('\n').count() {
        continue;
      }

      tracing::info!(file = %file.display(), "removed LFS rule for *.{}", self.artifact_ext);
      if kept.iter().all(|l| l.trim().is_empty()) {
        fs::remove_file(&file).with_context(|| format!("Failed to delete {}", file.display()))?;
        report.deleted.push(file.clone());
      } else {
        fs::write(&file, kept.concat()).with_context(|| format!("Failed to write {}", file.display()))?;
        report.rewritten.push(file.clone());
      }

      if let Ok(rel) = self.git.relative_to_work_tree(&file)
        && !rel.starts_with(".git")
        && self.git.is_tracked(&rel)?
        && !self.touched.contains(&rel)
      {
        self.touched.push(rel);
      }
    }

    report.override_added = self.ensure_override()?;
    Ok(report)
  }

  /// Append the override line unless it is already present; true when added
  fn ensure_override(&self) -> PackResult<bool> {
    let info_dir = self.git.git_dir()?.join("info");
    fs::create_dir_all(&info_dir).with_context(|| format!("Failed to create {}", info_dir.display()))?;
    let path = info_dir.join("attributes");
    let rule = self.override_rule();

    let existing = match fs::read_to_string(&path) {
      Ok(text) => text,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
      Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    if existing.lines().any(|l| l.trim() == rule) {
      return Ok(false);
    }

    let mut text = existing;
    if !text.is_empty() && !text.ends_with('\n') {
      text.push('\n');
    }
    text.push_str(&rule);
    text.push('\n');
    fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
  }

  fn block(&mut self, path: &Path) -> crate::core::error::PackError {
    self.enter(GuardState::Blocked);
    tracing::error!(path = %path.display(), "LFS pointer stub in publish set");
    PipelineError::PointerStubDetected {
      path: path.to_path_buf(),
    }
    .into()
  }

  /// Reject pointer stubs on disk; re-scrub once if a path still resolves to LFS
  pub fn stage(&mut self, set: &PublishSet) -> PackResult<()> {
    self.enter(GuardState::Stage);

    let mut rescrubbed = false;
    for rel in &set.paths {
      let abs = self.git.work_tree().join(rel);
      if is_pointer_stub(&file_prefix(&abs, POINTER_SIGNATURE.len())?) {
        return Err(self.block(rel));
      }

      if self.git.filter_attribute(rel)?.as_deref() == Some("lfs") && !rescrubbed {
        tracing::warn!(path = %path_to_git_format(rel), "still routed through LFS; scrubbing again");
        self.scrub()?;
        self.enter(GuardState::Stage);
        rescrubbed = true;
      }
    }

    for rel in self.touched.clone() {
      self.git.stage_path_state(&rel)?;
    }
    Ok(())
  }

  /// Untrack then re-track every path, and check what reached the index
  pub fn verify(&mut self, set: &PublishSet) -> PackResult<()> {
    self.enter(GuardState::Verify);

    for rel in &set.paths {
      self.git.untrack(rel)?;
      self.git.track(rel)?;
    }

    for rel in &set.paths {
      let staged = self.git.staged_blob_prefix(rel, POINTER_SIGNATURE.len())?;
      if is_pointer_stub(&staged) {
        for path in &set.paths {
          self.git.reset_path(path).ok();
        }
        return Err(self.block(rel));
      }
    }
    Ok(())
  }

  /// Paths the release commit may contain: the publish set and scrubbed attribute files
  fn commit_paths(&self, set: &PublishSet) -> Vec<PathBuf> {
    let mut paths = set.paths.clone();
    for rel in &self.touched {
      if !paths.contains(rel) {
        paths.push(rel.clone());
      }
    }
    paths
  }

  /// Commit the publish set; `None` when none of its paths differ from HEAD
  ///
  /// Anything else staged in the index stays staged and out of the commit.
  pub fn commit(&mut self, set: &PublishSet, subject: &str) -> PackResult<Option<String>> {
    self.enter(GuardState::Commit);

    let paths = self.commit_paths(set);
    if !self.git.has_staged_changes(&paths)? {
      return Ok(None);
    }

    let body = set.commit_body();
    let message = if body.is_empty() {
      format!("{}\n", subject)
    } else {
      format!("{}\n\n{}\n", subject, body)
    };
    let sha = self.git.commit(&message, &paths)?;
    tracing::info!(sha = %sha, subject, "created release commit");
    Ok(Some(sha))
  }

  /// Push the current branch to its upstream; failures are reported, not raised
  pub fn push(&mut self) -> PushStatus {
    self.enter(GuardState::Push);

    let upstream = match self.git.upstream() {
      Ok(Some(upstream)) => upstream,
      Ok(None) => return PushStatus::NoUpstream,
      Err(e) => return PushStatus::Failed { reason: e.to_string() },
    };

    match self.git.push_to_remote(&upstream.remote, &upstream.branch) {
      Ok(()) => PushStatus::Pushed {
        remote: upstream.remote,
        branch: upstream.branch,
      },
      Err(e) => {
        tracing::warn!(error = %e, "push failed; local commit kept");
        PushStatus::Failed { reason: e.to_string() }
      }
    }
  }

  /// Run the whole state machine for one publish set
  pub fn publish(mut self, set: &PublishSet, subject: &str) -> PackResult<PublishOutcome> {
    if set.is_empty() {
      self.enter(GuardState::Done);
      return Ok(PublishOutcome::NoOp);
    }

    let scrubbed = self.scrub()?;
    tracing::debug!(
      rewritten = scrubbed.rewritten.len(),
      deleted = scrubbed.deleted.len(),
      override_added = scrubbed.override_added,
      "scrubbed attribute files"
    );
    self.stage(set)?;
    self.verify(set)?;

    let outcome = match self.commit(set, subject)? {
      None => PublishOutcome::NoOp,
      Some(sha) => {
        let push = self.push();
        PublishOutcome::Committed { sha, push }
      }
    };
    self.enter(GuardState::Done);
    Ok(outcome)
  }
}
