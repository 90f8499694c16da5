//! Pipeline orchestrator
//!
//! ```text
//! passphrase -> locate -> [appboot bump] -> per bundle:
//!     archive -> digest -> manifest(1) -> encrypt -> digest -> manifest(2)
//!   -> publish once (one version for the whole run)
//! ```
//!
//! Bundles are built one after another. A fatal error in any step aborts the
//! run before anything is staged, so a bundle is either complete or never
//! published.

use crate::core::context::RunContext;
use crate::core::error::{PackError, PackResult, PipelineError, ResultExt};
use crate::pack::archive::{ArchiveLayout, build_archive};
use crate::pack::cipher::{self, CipherSpec};
use crate::pack::digest::{FileDigest, digest_file};
use crate::pack::locator::{self, SourceSet};
use crate::pack::manifest::{self, ArchiveSection, RecordedDigests};
use crate::pack::passphrase::{Passphrase, PassphraseChain};
use crate::release::appboot::{AppbootBump, bump_appboot};
use crate::release::guard::{ArtifactRecord, PublishGuard, PublishOutcome, PublishSet, PushStatus};
use crate::release::version::{ReleaseKind, ReleaseLine, VersionResolver};
use crate::ui::progress::GroupProgress;
use crate::utils::{RemoveOnDrop, path_to_git_format};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-bundle settings shared by every bundle in a run
#[derive(Debug, Clone)]
pub struct BuildOptions {
  pub cipher: CipherSpec,
  pub artifact_ext: String,
  /// Keep `<bundle>.zip` after encryption
  pub keep_archive: bool,
}

/// One output unit before it is built
#[derive(Debug, Clone)]
pub struct BundlePlan {
  pub name: String,
  pub sources: SourceSet,
  pub layout: ArchiveLayout,
  pub out_dir: PathBuf,
  /// Source root as the operator named it, recorded in the manifest
  pub src_label: String,
}

impl BundlePlan {
  pub fn archive_path(&self) -> PathBuf {
    self.out_dir.join(format!("{}.zip", self.name))
  }

  pub fn manifest_path(&self) -> PathBuf {
    self.out_dir.join(format!("{}.manifest.txt", self.name))
  }

  /// Entry names as they appear inside the archive
  fn entry_names(&self) -> Vec<PathBuf> {
    match self.layout {
      ArchiveLayout::Relative => self.sources.relative_paths(),
      ArchiveLayout::Flat => self
        .sources
        .files
        .iter()
        .filter_map(|f| f.file_name().map(PathBuf::from))
        .collect(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleStatus {
  /// Archived, encrypted and manifested in this run
  Rebuilt,
  /// Archive, cipher and passphrase matched the previous run; artifact reused as is
  Unchanged,
}

/// What one bundle produced
#[derive(Debug, Clone, Serialize)]
pub struct BundleReport {
  pub name: String,
  pub files: usize,
  pub status: BundleStatus,
  pub artifact: PathBuf,
  pub manifest: PathBuf,
  /// Set when `--keep` left the archive on disk
  pub archive: Option<PathBuf>,
  pub archive_digest: FileDigest,
  pub artifact_digest: FileDigest,
}

impl BundleReport {
  pub fn artifact_name(&self) -> String {
    self
      .artifact
      .file_name()
      .map(|n| n.to_string_lossy().to_string())
      .unwrap_or_default()
  }
}

/// Sibling path `.<name>.<tag>` used for outputs that are not final yet
fn staging_path(path: &Path, tag: &str) -> PathBuf {
  let name = path
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_default();
  path.with_file_name(format!(".{}.{}", name, tag))
}

/// Move a finished staged file over its final path
fn promote(staged: RemoveOnDrop, target: &Path) -> PackResult<()> {
  fs::rename(staged.path(), target).with_context(|| format!("Failed to move {} into place", target.display()))?;
  staged.keep();
  Ok(())
}

/// Digest of the existing artifact when it can stand in for a rebuild
///
/// The previous manifest must record this archive digest and cipher label, the
/// artifact on disk must match its recorded digest, and the passphrase of this
/// run must decrypt it back to this archive.
fn reusable_artifact(
  plan: &BundlePlan,
  recorded: &RecordedDigests,
  artifact: &Path,
  archive_digest: &FileDigest,
  passphrase: &Passphrase,
  options: &BuildOptions,
) -> PackResult<Option<FileDigest>> {
  if recorded.archive.as_deref() != Some(archive_digest.sha256.as_str())
    || recorded.cipher.as_deref() != Some(options.cipher.label().as_str())
    || !artifact.is_file()
  {
    return Ok(None);
  }
  let existing = digest_file(artifact)?;
  if recorded.artifact.as_deref() != Some(existing.sha256.as_str()) {
    return Ok(None);
  }

  let opened = RemoveOnDrop::new(staging_path(&plan.archive_path(), "check"));
  match cipher::decrypt(artifact, opened.path(), passphrase, &options.cipher) {
    Ok(()) => {}
    Err(PackError::Pipeline(PipelineError::Crypto { .. })) => {
      tracing::info!(bundle = %plan.name, "existing artifact does not open with this passphrase; rebuilding");
      return Ok(None);
    }
    Err(e) => return Err(e),
  }
  let opened_digest = digest_file(opened.path())?;
  Ok((opened_digest.sha256 == archive_digest.sha256).then_some(existing))
}

/// Encrypt and manifest into staged files, then move both into place
///
/// The previous artifact and manifest stay untouched until both new files are
/// complete.
fn encrypt_and_manifest(
  plan: &BundlePlan,
  archive: &Path,
  artifact: &Path,
  archive_digest: &FileDigest,
  passphrase: &Passphrase,
  options: &BuildOptions,
) -> PackResult<FileDigest> {
  let manifest_path = plan.manifest_path();
  let staged_manifest = RemoveOnDrop::new(staging_path(&manifest_path, "partial"));
  let staged_artifact = RemoveOnDrop::new(staging_path(artifact, "partial"));

  let files = plan.entry_names();
  let cipher_label = options.cipher.label();
  let archive_name = format!("{}.zip", plan.name);
  manifest::write_archive_section(
    staged_manifest.path(),
    &ArchiveSection {
      bundle: &plan.name,
      date: Utc::now(),
      cipher: &cipher_label,
      src: &plan.src_label,
      files: &files,
      archive_name: &archive_name,
      archive_digest,
    },
  )?;

  cipher::encrypt(archive, staged_artifact.path(), passphrase, &options.cipher)?;
  let artifact_digest = digest_file(staged_artifact.path())?;
  let artifact_name = artifact
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_default();
  manifest::append_artifact_section(staged_manifest.path(), &artifact_name, &artifact_digest)?;

  promote(staged_artifact, artifact)?;
  promote(staged_manifest, &manifest_path)?;
  Ok(artifact_digest)
}

/// Archive, digest, encrypt and manifest one bundle
///
/// The plaintext archive is removed on every exit path unless
/// `keep_archive` is set and the bundle completed.
pub fn build_bundle(plan: &BundlePlan, passphrase: &Passphrase, options: &BuildOptions) -> PackResult<BundleReport> {
  let archive = RemoveOnDrop::new(plan.archive_path());
  let manifest_path = plan.manifest_path();
  let artifact = cipher::artifact_path(archive.path(), &options.artifact_ext);

  build_archive(&plan.sources, archive.path(), plan.layout)?;
  let archive_digest = digest_file(archive.path())?;

  let reused = match manifest::read_recorded(&manifest_path)? {
    Some(recorded) => reusable_artifact(plan, &recorded, &artifact, &archive_digest, passphrase, options)?,
    None => None,
  };

  let (status, artifact_digest) = match reused {
    Some(existing) => {
      tracing::info!(bundle = %plan.name, "archive unchanged; keeping existing artifact");
      (BundleStatus::Unchanged, existing)
    }
    None => {
      let digest = encrypt_and_manifest(plan, archive.path(), &artifact, &archive_digest, passphrase, options)?;
      (BundleStatus::Rebuilt, digest)
    }
  };

  let kept = if options.keep_archive {
    Some(archive.keep())
  } else {
    drop(archive);
    None
  };

  Ok(BundleReport {
    name: plan.name.clone(),
    files: plan.sources.len(),
    status,
    artifact,
    manifest: manifest_path,
    archive: kept,
    archive_digest,
    artifact_digest,
  })
}

/// Which mode a build runs in
#[derive(Debug, Clone)]
pub enum BuildMode {
  /// One bundle for the whole source tree
  Bundle { name: Option<String> },
  /// One bundle per group, named `<prefix><key>`
  Groups { prefix: String },
}

/// Everything a build command asks for
#[derive(Debug, Clone)]
pub struct BuildRequest {
  pub mode: BuildMode,
  pub src: PathBuf,
  /// Output directory; the source root when `None`
  pub dest: Option<PathBuf>,
  pub keep_archive: bool,
  pub publish: bool,
  pub bump_appboot: Option<PathBuf>,
  pub show_progress: bool,
}

/// Publish step result as reported to the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishReport {
  /// `--no-publish`
  Skipped,
  Committed {
    version: String,
    subject: String,
    sha: String,
    push: PushStatus,
  },
  /// Nothing differed from HEAD
  NoOp,
}

/// Outcome of a whole build run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
  pub kind: ReleaseKind,
  pub src: String,
  /// Passphrase provider that supplied the secret
  pub passphrase_source: &'static str,
  pub bundles: Vec<BundleReport>,
  /// Group keys with no frames
  pub skipped: Vec<String>,
  pub appboot: Option<AppbootBump>,
  pub publish: PublishReport,
}

/// Sequences one build run
pub struct Pipeline<'a> {
  ctx: &'a RunContext,
  passphrase: PassphraseChain,
}

impl<'a> Pipeline<'a> {
  pub fn new(ctx: &'a RunContext, passphrase: PassphraseChain) -> Self {
    Self { ctx, passphrase }
  }

  pub fn run(&self, request: &BuildRequest) -> PackResult<RunSummary> {
    let (passphrase, passphrase_source) = self.passphrase.resolve()?;
    let options = BuildOptions {
      cipher: CipherSpec::from(&self.ctx.config.cipher),
      artifact_ext: self.ctx.config.publish.artifact_extension.clone(),
      keep_archive: request.keep_archive,
    };

    let src_root = self.ctx.resolve(&request.src);
    let src_label = path_to_git_format(&request.src);
    let out_dir = match &request.dest {
      Some(dest) => self.ctx.resolve(dest),
      None => src_root.clone(),
    };

    let (kind, plans, skipped) = match &request.mode {
      BuildMode::Bundle { name } => {
        let sources = locator::locate_bundle(&src_root, &self.ctx.config.bundle.extensions)?;
        let name = name.clone().unwrap_or_else(|| self.ctx.config.bundle.name.clone());
        let plan = BundlePlan {
          name,
          sources,
          layout: ArchiveLayout::Relative,
          out_dir: out_dir.clone(),
          src_label: src_label.clone(),
        };
        (ReleaseKind::Bundle, vec![plan], Vec::new())
      }
      BuildMode::Groups { prefix } => {
        let (plans, skipped) = self.plan_groups(&src_root, &out_dir, &src_label, prefix)?;
        (ReleaseKind::Groups, plans, skipped)
      }
    };

    let appboot = match &request.bump_appboot {
      Some(path) => Some(bump_appboot(&self.ctx.resolve(path))?),
      None => None,
    };

    fs::create_dir_all(&out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let mut progress = GroupProgress::new(plans.len(), "bundles", request.show_progress && plans.len() > 1);
    let mut bundles = Vec::with_capacity(plans.len());
    for plan in &plans {
      tracing::info!(bundle = %plan.name, files = plan.sources.len(), "building bundle");
      bundles.push(build_bundle(plan, &passphrase, &options)?);
      progress.inc();
    }

    let publish = if request.publish {
      self.publish(kind, &bundles, &options.artifact_ext)?
    } else {
      tracing::info!("publishing disabled; artifacts left in the working tree");
      PublishReport::Skipped
    };

    Ok(RunSummary {
      kind,
      src: src_label,
      passphrase_source,
      bundles,
      skipped,
      appboot,
      publish,
    })
  }

  /// One plan per group with frames; keys without frames are skipped
  fn plan_groups(
    &self,
    src_root: &Path,
    out_dir: &Path,
    src_label: &str,
    prefix: &str,
  ) -> PackResult<(Vec<BundlePlan>, Vec<String>)> {
    let extension = &self.ctx.config.groups.extension;
    let groups = locator::locate_groups(src_root, extension)?;

    let mut plans = Vec::new();
    let mut skipped = Vec::new();
    for (key, frames) in &groups.groups {
      if frames.is_empty() {
        tracing::warn!(group = %key, "no {}_<n>.{} frames; skipping group", key, extension);
        skipped.push(key.clone());
        continue;
      }
      plans.push(BundlePlan {
        name: format!("{}{}", prefix, key),
        sources: groups.source_set(key),
        layout: ArchiveLayout::Flat,
        out_dir: out_dir.to_path_buf(),
        src_label: src_label.to_string(),
      });
    }

    if plans.is_empty() {
      return Err(
        PipelineError::EmptySource {
          root: groups.root,
          wanted: format!("<name>_<n>.{} frames", extension),
        }
        .into(),
      );
    }
    Ok((plans, skipped))
  }

  /// Commit every artifact and manifest of the run under one version
  fn publish(&self, kind: ReleaseKind, bundles: &[BundleReport], artifact_ext: &str) -> PackResult<PublishReport> {
    let git = self.ctx.require_git()?;
    let prefix = match kind {
      ReleaseKind::Bundle => &self.ctx.config.bundle.release_prefix,
      ReleaseKind::Groups => &self.ctx.config.groups.release_prefix,
    };
    let line = ReleaseLine::new(kind, prefix.clone());

    let mut set = PublishSet::default();
    for bundle in bundles {
      set.paths.push(git.relative_to_work_tree(&bundle.artifact)?);
      set.paths.push(git.relative_to_work_tree(&bundle.manifest)?);
      set.artifacts.push(ArtifactRecord {
        name: bundle.artifact_name(),
        digest: bundle.artifact_digest.clone(),
      });
    }

    let version = VersionResolver::new(git).next(&line)?;
    let subject = line.subject(version);
    let guard = PublishGuard::new(git, artifact_ext);

    Ok(match guard.publish(&set, &subject)? {
      PublishOutcome::Committed { sha, push } => PublishReport::Committed {
        version: version.to_string(),
        subject,
        sha,
        push,
      },
      PublishOutcome::NoOp => PublishReport::NoOp,
    })
  }
}
