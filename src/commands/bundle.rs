//! `payload bundle`: the whole source tree as one release

use super::{BuildFlags, execute};
use crate::core::context::RunContext;
use crate::core::error::PackResult;
use crate::core::pipeline::BuildMode;
use std::path::PathBuf;

/// Build `<name>.zip.enc` from every matching file under `src` and publish it
/// as `<prefix> v<major>.<minor>`
pub fn run_bundle(
  ctx: &RunContext,
  src: PathBuf,
  dest: Option<PathBuf>,
  name: Option<String>,
  flags: BuildFlags,
) -> PackResult<()> {
  if !flags.json {
    println!("🔐 Bundling {}", src.display());
  }
  execute(ctx, BuildMode::Bundle { name }, src, dest, flags)
}
