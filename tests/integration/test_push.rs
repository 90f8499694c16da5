//! Integration tests for pushing the release commit

use crate::helpers::{PASSPHRASE, TestRepo, git, run_payload_json, tools_available};
use anyhow::Result;
use tempfile::TempDir;

/// Bare repository registered as `origin`, with `main` tracking it
fn with_origin(repo: &TestRepo) -> Result<TempDir> {
  let remote = TempDir::new()?;
  git(remote.path(), &["init", "--bare", "--initial-branch=main"])?;
  let url = remote.path().to_string_lossy().to_string();
  git(&repo.path, &["remote", "add", "origin", &url])?;
  git(&repo.path, &["push", "--quiet", "-u", "origin", "main"])?;
  Ok(remote)
}

fn head(repo: &TestRepo) -> Result<String> {
  let output = git(&repo.path, &["rev-parse", "HEAD"])?;
  Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[test]
fn test_release_is_pushed_to_upstream() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  repo.write("data/js/app.json", "{}")?;
  let remote = with_origin(&repo)?;

  let summary = run_payload_json(&repo.path, &["bundle", "-k", PASSPHRASE])?;
  let push = &summary["publish"]["push"];
  assert_eq!(push["status"], "pushed");
  assert_eq!(push["remote"], "origin");
  assert_eq!(push["branch"], "main");

  let remote_main = git(remote.path(), &["rev-parse", "main"])?;
  assert_eq!(String::from_utf8_lossy(&remote_main.stdout).trim(), head(&repo)?);
  assert_eq!(summary["publish"]["sha"], head(&repo)?);

  Ok(())
}

#[test]
fn test_unreachable_upstream_keeps_local_commit() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  repo.write("data/js/app.json", "{}")?;
  let remote = with_origin(&repo)?;
  let gone = remote.path().join("missing.git").to_string_lossy().to_string();
  git(&repo.path, &["remote", "set-url", "origin", &gone])?;

  // run_payload_json fails on a nonzero exit
  let summary = run_payload_json(&repo.path, &["bundle", "-k", PASSPHRASE])?;
  assert_eq!(summary["publish"]["status"], "committed");
  assert_eq!(summary["publish"]["push"]["status"], "failed");
  assert!(
    !summary["publish"]["push"]["reason"]
      .as_str()
      .unwrap_or_default()
      .is_empty()
  );

  assert_eq!(repo.subjects()?[0], "payload v1.1");
  assert_eq!(summary["publish"]["sha"], head(&repo)?);

  Ok(())
}
