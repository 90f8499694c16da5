//! `payload groups`: one bundle per frame group, one release for all of them

use super::{BuildFlags, execute};
use crate::core::context::RunContext;
use crate::core::error::PackResult;
use crate::core::pipeline::BuildMode;
use std::path::PathBuf;

/// Build `<prefix><key>.zip.enc` for every `<key>_<n>.<ext>` group under `src`
pub fn run_groups(
  ctx: &RunContext,
  src: PathBuf,
  dest: Option<PathBuf>,
  prefix: Option<String>,
  flags: BuildFlags,
) -> PackResult<()> {
  if !flags.json {
    println!(
      "🔐 Bundling *.{} groups in {}",
      ctx.config.groups.extension,
      src.display()
    );
  }
  let prefix = prefix.unwrap_or_default();
  execute(ctx, BuildMode::Groups { prefix }, src, dest, flags)
}
