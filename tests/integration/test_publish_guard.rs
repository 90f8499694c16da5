//! Integration tests for publishing around git-lfs rules

use crate::helpers::{PASSPHRASE, TestRepo, git, run_payload, run_payload_json, run_payload_raw, tools_available};
use anyhow::Result;
use sha2::{Digest, Sha256};

const STUB: &str = "version https://git-lfs.github.com/spec/v1\noid sha256:4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393\nsize 4096\n";

#[test]
fn test_lfs_rule_is_scrubbed_and_bytes_committed() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  repo.write(".gitattributes", "*.enc filter=lfs diff=lfs merge=lfs -text\n*.psd filter=lfs diff=lfs merge=lfs -text\n")?;
  repo.write("data/js/app.json", "{}")?;
  repo.commit("track binaries with lfs")?;

  run_payload(&repo.path, &["bundle", "-k", PASSPHRASE])?;

  let on_disk = std::fs::read(repo.path.join("data/js/app.zip.enc"))?;
  assert_eq!(repo.committed_bytes("data/js/app.zip.enc")?, on_disk);

  let attrs = repo.read_file(".gitattributes")?;
  assert_eq!(attrs, "*.psd filter=lfs diff=lfs merge=lfs -text\n");
  assert_eq!(
    String::from_utf8_lossy(&repo.committed_bytes(".gitattributes")?),
    "*.psd filter=lfs diff=lfs merge=lfs -text\n"
  );

  let info = repo.read_file(".git/info/attributes")?;
  assert_eq!(info.matches("*.enc -filter -diff -merge -text").count(), 1);

  // Override is never duplicated
  repo.write("data/js/app.json", "{\"v\":2}")?;
  run_payload(&repo.path, &["bundle", "-k", PASSPHRASE])?;
  let info = repo.read_file(".git/info/attributes")?;
  assert_eq!(info.matches("*.enc -filter -diff -merge -text").count(), 1);
  assert_eq!(repo.subjects()?[0], "payload v1.2");

  Ok(())
}

#[test]
fn test_pointer_stub_blocks_publish() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  repo.write("data/js/app.json", "{}")?;
  run_payload(&repo.path, &["bundle", "--no-publish", "-k", PASSPHRASE])?;

  // Simulate a checkout where LFS replaced the artifact with its pointer
  repo.write("data/js/app.zip.enc", STUB)?;
  let stub_digest = hex::encode(Sha256::digest(STUB.as_bytes()));
  let manifest = repo.read_file("data/js/app.manifest.txt")?;
  let mut lines: Vec<String> = manifest.lines().map(String::from).collect();
  if let Some(pos) = lines.iter().position(|l| l == "# sha256(enc):") {
    lines[pos + 1] = format!("{}  app.zip.enc", stub_digest);
  }
  repo.write("data/js/app.manifest.txt", format!("{}\n", lines.join("\n")))?;

  let commits_before = repo.subjects()?.len();
  let output = run_payload_raw(&repo.path, &["bundle", "-k", PASSPHRASE])?;

  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("LFS pointer stub"), "stderr: {}", stderr);
  assert_eq!(repo.subjects()?.len(), commits_before);

  let staged = git(&repo.path, &["diff", "--cached", "--name-only"])?;
  assert!(String::from_utf8_lossy(&staged.stdout).trim().is_empty());

  Ok(())
}

#[test]
fn test_operator_staged_file_stays_out_of_release() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  repo.write("data/js/app.json", "{}")?;
  run_payload(&repo.path, &["bundle", "-k", PASSPHRASE])?;
  let commits_before = repo.subjects()?.len();

  repo.write("secret-notes.txt", "not for release\n")?;
  git(&repo.path, &["add", "secret-notes.txt"])?;

  // Same inputs: nothing to release even though the index is dirty
  let summary = run_payload_json(&repo.path, &["bundle", "-k", PASSPHRASE])?;
  assert_eq!(summary["bundles"][0]["status"], "unchanged");
  assert_eq!(summary["publish"]["status"], "no_op");
  assert_eq!(repo.subjects()?.len(), commits_before);

  repo.write("data/js/app.json", "{\"v\":2}")?;
  let summary = run_payload_json(&repo.path, &["bundle", "-k", PASSPHRASE])?;
  assert_eq!(summary["publish"]["subject"], "payload v1.2");

  let committed = git(&repo.path, &["show", "--name-only", "--format=", "HEAD"])?;
  let committed = String::from_utf8_lossy(&committed.stdout);
  assert!(!committed.contains("secret-notes.txt"), "committed: {}", committed);
  assert!(committed.contains("data/js/app.zip.enc"));

  let staged = git(&repo.path, &["diff", "--cached", "--name-only"])?;
  assert_eq!(String::from_utf8_lossy(&staged.stdout).trim(), "secret-notes.txt");

  Ok(())
}
