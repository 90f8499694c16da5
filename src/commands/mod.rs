//! CLI commands for payload
//!
//! - **bundle**: one encrypted bundle for a whole source tree
//! - **groups**: one encrypted bundle per `<key>_<n>` frame group
//! - **decrypt**: turn an artifact back into its archive
//!
//! All commands accept `&RunContext` built once in main.

pub mod bundle;
pub mod decrypt;
pub mod groups;

pub use bundle::run_bundle;
pub use decrypt::run_decrypt;
pub use groups::run_groups;

use crate::core::context::RunContext;
use crate::core::error::PackResult;
use crate::core::pipeline::{BuildMode, BuildRequest, BundleStatus, Pipeline, PublishReport, RunSummary};
use crate::pack::passphrase::PassphraseChain;
use crate::pack::tool;
use crate::release::guard::PushStatus;
use std::path::PathBuf;

/// Flags shared by the build commands
#[derive(Debug, Clone, Default)]
pub struct BuildFlags {
  pub passphrase: Option<String>,
  pub passphrase_file: Option<PathBuf>,
  pub keep: bool,
  pub no_publish: bool,
  pub bump_appboot: Option<PathBuf>,
  pub json: bool,
}

impl BuildFlags {
  /// Tools a build needs on PATH
  fn required_tools(&self) -> Vec<&'static str> {
    let mut tools = vec!["zip", "openssl"];
    if !self.no_publish {
      tools.push("git");
    }
    tools
  }
}

/// Preflight, run the pipeline, print the summary
fn execute(ctx: &RunContext, mode: BuildMode, src: PathBuf, dest: Option<PathBuf>, flags: BuildFlags) -> PackResult<()> {
  tool::require(&flags.required_tools())?;
  if !flags.no_publish {
    ctx.require_git()?;
  }

  let chain = PassphraseChain::standard(
    flags.passphrase,
    flags.passphrase_file,
    &ctx.config.publish.passphrase_env,
    true,
  );
  let request = BuildRequest {
    mode,
    src,
    dest,
    keep_archive: flags.keep,
    publish: !flags.no_publish,
    bump_appboot: flags.bump_appboot,
    show_progress: !flags.json,
  };

  let summary = Pipeline::new(ctx, chain).run(&request)?;
  if flags.json {
    println!("{}", serde_json::to_string_pretty(&summary)?);
  } else {
    print_summary(&summary);
  }
  Ok(())
}

fn short_sha(sha: &str) -> &str {
  sha.get(..7).unwrap_or(sha)
}

fn print_summary(summary: &RunSummary) {
  if let Some(bump) = &summary.appboot {
    println!(
      "🔢 {}: app {} -> {}, model {} -> {}",
      bump.path.display(),
      bump.app_version.0,
      bump.app_version.1,
      bump.model_version.0,
      bump.model_version.1
    );
  }

  println!("📦 {} bundle(s) from {}", summary.bundles.len(), summary.src);
  for bundle in &summary.bundles {
    let marker = match bundle.status {
      BundleStatus::Rebuilt => "✅",
      BundleStatus::Unchanged => "♻️ ",
    };
    println!(
      "   {} {} ({} files) {}  sha256={}  {} MB",
      marker,
      bundle.name,
      bundle.files,
      bundle.artifact_name(),
      bundle.artifact_digest.sha256,
      bundle.artifact_digest.megabytes()
    );
    if let Some(archive) = &bundle.archive {
      println!("      kept {}", archive.display());
    }
  }
  for key in &summary.skipped {
    println!("   ⏭️  {} skipped (no frames)", key);
  }

  println!();
  match &summary.publish {
    PublishReport::Skipped => println!("⏸️  Publishing skipped (--no-publish)"),
    PublishReport::NoOp => println!("ℹ️  Nothing changed since the last release; no commit created"),
    PublishReport::Committed {
      subject, sha, push, ..
    } => {
      println!("🔖 Committed '{}' ({})", subject, short_sha(sha));
      match push {
        PushStatus::Pushed { remote, branch } => println!("   📤 Pushed to {}/{}", remote, branch),
        PushStatus::NoUpstream => println!("   ℹ️  No upstream configured; commit kept locally"),
        PushStatus::Failed { reason } => {
          println!("   ⚠️  Push failed; commit kept locally");
          println!("      {}", reason.trim());
        }
      }
    }
  }
}
