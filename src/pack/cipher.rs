//! Passphrase-based encryption through `openssl enc`
//!
//! Key derivation is PBKDF2 with a fixed digest. Encryption asks openssl for a
//! fresh random salt, which it stores in the `Salted__` header; decryption reads
//! it back from there. The passphrase travels in a private environment variable
//! (`-pass env:`) and never appears on a command line.

use crate::core::config::CipherConfig;
use crate::core::error::{PackResult, PipelineError, ResultExt};
use crate::pack::passphrase::Passphrase;
use crate::pack::tool::tool_cmd;
use crate::utils::remove_file_best_effort;
use std::path::{Path, PathBuf};

const PASS_ENV: &str = "PAYLOAD_CIPHER_PASS";

/// Cipher parameters shared by encrypt and decrypt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherSpec {
  /// openssl cipher name, e.g. `aes-256-cbc`
  pub id: String,
  /// PBKDF2 digest, e.g. `sha256`
  pub digest: String,
  pub iterations: Option<u32>,
}

impl From<&CipherConfig> for CipherSpec {
  fn from(config: &CipherConfig) -> Self {
    Self {
      id: config.id.clone(),
      digest: config.digest.clone(),
      iterations: config.iterations,
    }
  }
}

impl CipherSpec {
  /// Label written to manifests
  pub fn label(&self) -> String {
    match self.iterations {
      Some(iter) => format!("{} (pbkdf2, {}, iter={})", self.id, self.digest, iter),
      None => format!("{} (pbkdf2, {})", self.id, self.digest),
    }
  }

  fn run(&self, decrypt: bool, input: &Path, output: &Path, passphrase: &Passphrase) -> PackResult<()> {
    let mut cmd = tool_cmd("openssl", None);
    cmd.arg("enc");
    if decrypt {
      cmd.arg("-d");
    }
    cmd.arg(format!("-{}", self.id));
    if !decrypt {
      cmd.arg("-salt");
    }
    cmd.args(["-pbkdf2", "-md", &self.digest]);
    if let Some(iter) = self.iterations {
      cmd.arg("-iter").arg(iter.to_string());
    }
    cmd.arg("-in").arg(input).arg("-out").arg(output);
    cmd.arg("-pass").arg(format!("env:{}", PASS_ENV));
    cmd.env(PASS_ENV, passphrase.expose());

    tracing::debug!(cipher = %self.id, decrypt, input = %input.display(), "running openssl enc");

    let result = cmd.output().context("Failed to run openssl")?;
    if !result.status.success() {
      // A partial output is never left behind for someone to mistake as valid
      remove_file_best_effort(output).ok();
      return Err(
        PipelineError::Crypto {
          status: result.status.code(),
          stderr: String::from_utf8_lossy(&result.stderr).to_string(),
        }
        .into(),
      );
    }
    Ok(())
  }
}

/// Encrypted artifact path for an archive: `<archive>.<artifact_ext>`
pub fn artifact_path(archive: &Path, artifact_ext: &str) -> PathBuf {
  let mut name = archive.as_os_str().to_os_string();
  name.push(".");
  name.push(artifact_ext);
  PathBuf::from(name)
}

/// Encrypt `archive` into `artifact`
pub fn encrypt(archive: &Path, artifact: &Path, passphrase: &Passphrase, spec: &CipherSpec) -> PackResult<()> {
  spec.run(false, archive, artifact, passphrase)
}

/// Decrypt `artifact` into `output`; a wrong passphrase fails with `Crypto`
pub fn decrypt(artifact: &Path, output: &Path, passphrase: &Passphrase, spec: &CipherSpec) -> PackResult<()> {
  if !artifact.is_file() {
    return Err(crate::core::error::PackError::with_help(
      format!("Encrypted input not found: {}", artifact.display()),
      "Pass the .zip.enc artifact with -i/--input.",
    ));
  }
  spec.run(true, artifact, output, passphrase)
}
