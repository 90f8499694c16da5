//! `payload decrypt`: artifact back to archive, nothing else

use crate::core::context::RunContext;
use crate::core::error::{PackResult, ResultExt};
use crate::pack::cipher::{self, CipherSpec};
use crate::pack::passphrase::PassphraseChain;
use crate::pack::tool;
use std::fs;
use std::path::PathBuf;

/// Decrypt `input` into `output`
///
/// Touches no archive, manifest or repository state. A wrong passphrase fails
/// with the openssl status and leaves no output file behind.
pub fn run_decrypt(
  ctx: &RunContext,
  input: PathBuf,
  output: PathBuf,
  passphrase: Option<String>,
  passphrase_file: Option<PathBuf>,
) -> PackResult<()> {
  tool::require(&["openssl"])?;

  let input = ctx.resolve(&input);
  let output = ctx.resolve(&output);
  if let Some(parent) = output.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
  }

  let chain = PassphraseChain::standard(passphrase, passphrase_file, &ctx.config.publish.passphrase_env, false);
  let (passphrase, _) = chain.resolve()?;

  let spec = CipherSpec::from(&ctx.config.cipher);
  cipher::decrypt(&input, &output, &passphrase, &spec)?;

  println!("🔓 Decrypted {} -> {}", input.display(), output.display());
  Ok(())
}
