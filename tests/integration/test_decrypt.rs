//! Integration tests for `payload decrypt`

use crate::helpers::{PASSPHRASE, TestRepo, run_payload, run_payload_raw, tools_available};
use anyhow::Result;

fn build_kept_bundle(repo: &TestRepo) -> Result<()> {
  repo.write("data/js/appboot.json", r#"{"appVersion":"3.1.4"}"#)?;
  repo.write("data/js/main.js", "export default 42;\n")?;
  run_payload(&repo.path, &["bundle", "--keep", "--no-publish", "-k", PASSPHRASE])?;
  Ok(())
}

#[test]
fn test_decrypt_restores_archive_bytes() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  build_kept_bundle(&repo)?;

  run_payload(
    &repo.path,
    &["decrypt", "-i", "data/js/app.zip.enc", "-O", "restored/app.zip", "-k", PASSPHRASE],
  )?;

  let original = std::fs::read(repo.path.join("data/js/app.zip"))?;
  let restored = std::fs::read(repo.path.join("restored/app.zip"))?;
  assert_eq!(original, restored);

  Ok(())
}

#[test]
fn test_decrypt_with_passphrase_file() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  build_kept_bundle(&repo)?;
  repo.write("secret.txt", format!("{}\n", PASSPHRASE))?;

  run_payload(
    &repo.path,
    &["decrypt", "-i", "data/js/app.zip.enc", "-O", "out.zip", "--passphrase-file", "secret.txt"],
  )?;
  assert!(repo.file_exists("out.zip"));

  Ok(())
}

#[test]
fn test_wrong_passphrase_fails_without_output() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  build_kept_bundle(&repo)?;

  let output = run_payload_raw(
    &repo.path,
    &["decrypt", "-i", "data/js/app.zip.enc", "-O", "out.zip", "-k", "not the passphrase"],
  )?;
  assert_eq!(output.status.code(), Some(2));
  assert!(String::from_utf8_lossy(&output.stderr).contains("openssl failed"));
  assert!(!repo.file_exists("out.zip"));

  Ok(())
}

#[test]
fn test_decrypt_missing_input() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;

  let output = run_payload_raw(&repo.path, &["decrypt", "-i", "nope.enc", "-O", "out.zip", "-k", PASSPHRASE])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("Encrypted input not found"));

  Ok(())
}
