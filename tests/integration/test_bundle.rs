//! Integration tests for `payload bundle`

use crate::helpers::{PASSPHRASE, TestRepo, run_payload, run_payload_json, run_payload_raw, tools_available};
use anyhow::Result;

fn seed_sources(repo: &TestRepo) -> Result<()> {
  repo.write("data/js/appboot.json", r#"{"appVersion":"1.0.0","modelVersion":"2024-01-01"}"#)?;
  repo.write("data/js/lib/main.js", "console.log('hello');\n")?;
  repo.write("data/js/notes.txt", "not packed\n")?;
  Ok(())
}

#[test]
fn test_bundle_builds_and_commits_first_release() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  seed_sources(&repo)?;

  let summary = run_payload_json(&repo.path, &["bundle", "-k", PASSPHRASE])?;

  assert_eq!(summary["kind"], "bundle");
  assert_eq!(summary["bundles"][0]["name"], "app");
  assert_eq!(summary["bundles"][0]["files"], 2);
  assert_eq!(summary["bundles"][0]["status"], "rebuilt");
  assert_eq!(summary["publish"]["status"], "committed");
  assert_eq!(summary["publish"]["version"], "1.1");
  assert_eq!(summary["publish"]["push"]["status"], "no_upstream");

  assert!(repo.file_exists("data/js/app.zip.enc"));
  assert!(repo.file_exists("data/js/app.manifest.txt"));
  assert!(!repo.file_exists("data/js/app.zip"), "intermediate archive should be removed");

  assert_eq!(repo.subjects()?[0], "payload v1.1");
  let on_disk = std::fs::read(repo.path.join("data/js/app.zip.enc"))?;
  assert_eq!(repo.committed_bytes("data/js/app.zip.enc")?, on_disk);
  assert!(on_disk.starts_with(b"Salted__"));

  let manifest = repo.read_file("data/js/app.manifest.txt")?;
  assert!(manifest.starts_with("bundle: app\n"));
  assert!(manifest.contains("src: data/js\n"));
  assert!(manifest.contains("# files:\nappboot.json\nlib/main.js\n# sha256(zip):\n"));
  assert!(manifest.contains("  app.zip\n# sha256(enc):\n"));
  assert!(manifest.contains("  app.zip.enc\n# size(enc): "));
  assert!(manifest.trim_end().ends_with(" MB"));

  let body = repo.head_message()?;
  let sha = summary["bundles"][0]["artifact_digest"]["sha256"].as_str().unwrap_or_default();
  assert!(body.contains(&format!("app.zip.enc  sha256={}  size=", sha)));

  Ok(())
}

#[test]
fn test_second_identical_run_is_noop() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  seed_sources(&repo)?;

  run_payload(&repo.path, &["bundle", "-k", PASSPHRASE])?;
  let commits_before = repo.subjects()?.len();

  let output = run_payload(&repo.path, &["bundle", "-k", PASSPHRASE])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("no commit created"), "stdout: {}", stdout);
  assert_eq!(repo.subjects()?.len(), commits_before);

  Ok(())
}

#[test]
fn test_version_continues_from_history() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  seed_sources(&repo)?;
  repo.commit("payload v1.7")?;
  repo.commit("assets version 4.0")?;

  let summary = run_payload_json(&repo.path, &["bundle", "-k", PASSPHRASE])?;
  assert_eq!(summary["publish"]["subject"], "payload v1.8");
  assert_eq!(repo.subjects()?[0], "payload v1.8");

  Ok(())
}

#[test]
fn test_empty_source_is_fatal() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  repo.write("data/js/readme.txt", "nothing to pack\n")?;

  let output = run_payload_raw(&repo.path, &["bundle", "-k", PASSPHRASE, "--no-publish"])?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("No *.json, *.js found"), "stderr: {}", stderr);
  assert!(!repo.file_exists("data/js/app.zip"));
  assert!(!repo.file_exists("data/js/app.zip.enc"));
  assert!(!repo.file_exists("data/js/app.manifest.txt"));

  Ok(())
}

#[test]
fn test_missing_source_is_fatal() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;

  let output = run_payload_raw(&repo.path, &["bundle", "-s", "nope", "-k", PASSPHRASE])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("Source directory not found"));

  Ok(())
}

#[test]
fn test_missing_passphrase_is_fatal() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  seed_sources(&repo)?;

  let output = run_payload_raw(&repo.path, &["bundle", "--no-publish"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("No passphrase available"));
  assert!(!repo.file_exists("data/js/app.zip.enc"));

  Ok(())
}

#[test]
fn test_no_publish_keep_and_custom_name() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  seed_sources(&repo)?;
  let commits_before = repo.subjects()?.len();

  let summary = run_payload_json(
    &repo.path,
    &["bundle", "-o", "web", "-d", "out", "--keep", "--no-publish", "-k", PASSPHRASE],
  )?;

  assert_eq!(summary["publish"]["status"], "skipped");
  assert!(repo.file_exists("out/web.zip"));
  assert!(repo.file_exists("out/web.zip.enc"));
  assert!(repo.file_exists("out/web.manifest.txt"));
  assert_eq!(repo.subjects()?.len(), commits_before);

  let entries = crate::helpers::zip_entries(&repo.path.join("out/web.zip"))?;
  assert_eq!(entries, vec!["appboot.json".to_string(), "lib/main.js".to_string()]);

  Ok(())
}

#[test]
fn test_bump_appboot_before_build() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  seed_sources(&repo)?;

  let summary = run_payload_json(
    &repo.path,
    &["bundle", "--bump-appboot", "data/js/appboot.json", "--no-publish", "-k", PASSPHRASE],
  )?;
  assert_eq!(summary["appboot"]["app_version"][1], "1.0.1");

  let doc: serde_json::Value = serde_json::from_str(&repo.read_file("data/js/appboot.json")?)?;
  assert_eq!(doc["appVersion"], "1.0.1");
  assert_ne!(doc["modelVersion"], "2024-01-01");

  // The backup is not picked up as a bundle source
  assert_eq!(summary["bundles"][0]["files"], 2);

  Ok(())
}

#[test]
fn test_config_file_changes_prefix_and_name() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  seed_sources(&repo)?;
  repo.write(
    "payload.toml",
    "[bundle]\nname = \"loop\"\nrelease_prefix = \"webapp\"\n\n[cipher]\niterations = 1000\n",
  )?;

  run_payload(&repo.path, &["bundle", "-k", PASSPHRASE])?;
  assert_eq!(repo.subjects()?[0], "webapp v1.1");
  assert!(repo.file_exists("data/js/loop.zip.enc"));
  assert!(repo.read_file("data/js/loop.manifest.txt")?.contains("iter=1000"));

  Ok(())
}

#[test]
fn test_invalid_config_exits_with_user_error() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write("payload.toml", "[cipher]\nid = \"aes-256-cbc; rm -rf\"\n")?;

  let output = run_payload_raw(&repo.path, &["bundle", "-k", PASSPHRASE])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("cipher.id"));

  Ok(())
}

#[test]
fn test_rotated_passphrase_publishes_new_release() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  seed_sources(&repo)?;
  let rotated = "rotated passphrase";

  run_payload(&repo.path, &["bundle", "-k", PASSPHRASE])?;
  let summary = run_payload_json(&repo.path, &["bundle", "-k", rotated])?;
  assert_eq!(summary["bundles"][0]["status"], "rebuilt");
  assert_eq!(summary["publish"]["subject"], "payload v1.2");

  run_payload(
    &repo.path,
    &["decrypt", "-i", "data/js/app.zip.enc", "-O", "opened.zip", "-k", rotated],
  )?;
  assert!(repo.file_exists("opened.zip"));

  Ok(())
}
