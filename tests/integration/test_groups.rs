//! Integration tests for `payload groups`

use crate::helpers::{PASSPHRASE, TestRepo, run_payload, run_payload_json, run_payload_raw, tools_available, zip_entries};
use anyhow::Result;
use sha2::{Digest, Sha256};

fn seed_pets(repo: &TestRepo) -> Result<()> {
  repo.write("art/pet1_1.png", b"\x89PNG pet1 frame 1")?;
  repo.write("art/pet1_2.png", b"\x89PNG pet1 frame 2")?;
  repo.write("art/pet2_1.png", b"\x89PNG pet2 frame 1")?;
  Ok(())
}

#[test]
fn test_pet_groups_produce_one_bundle_each() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  seed_pets(&repo)?;

  let summary = run_payload_json(&repo.path, &["groups", "-s", "art", "--keep", "--no-publish", "-k", PASSPHRASE])?;
  let names: Vec<&str> = summary["bundles"]
    .as_array()
    .map(|b| b.iter().filter_map(|x| x["name"].as_str()).collect())
    .unwrap_or_default();
  assert_eq!(names, vec!["pet1", "pet2"]);

  let entries = zip_entries(&repo.path.join("art/pet1.zip"))?;
  assert_eq!(entries, vec!["pet1_1.png".to_string(), "pet1_2.png".to_string()]);

  let manifest = repo.read_file("art/pet1.manifest.txt")?;
  assert!(manifest.contains("# files:\npet1_1.png\npet1_2.png\n# sha256(zip):\n"));

  let archive_digest = hex::encode(Sha256::digest(std::fs::read(repo.path.join("art/pet1.zip"))?));
  assert!(manifest.contains(&format!("{}  pet1.zip\n", archive_digest)));

  Ok(())
}

#[test]
fn test_group_release_bumps_once_from_history() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  seed_pets(&repo)?;
  repo.commit("assets version 2.3")?;

  let summary = run_payload_json(&repo.path, &["groups", "-s", "art", "-k", PASSPHRASE])?;
  assert_eq!(summary["publish"]["version"], "2.4");

  let subjects = repo.subjects()?;
  assert_eq!(subjects[0], "assets version 2.4");
  assert_eq!(subjects[1], "assets version 2.3");

  let body = repo.head_message()?;
  assert!(body.contains("pet1.zip.enc  sha256="));
  assert!(body.contains("pet2.zip.enc  sha256="));
  assert!(repo.committed_bytes("art/pet1.manifest.txt").is_ok());
  assert!(repo.committed_bytes("art/pet2.zip.enc").is_ok());

  Ok(())
}

#[test]
fn test_group_without_frames_is_skipped() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  repo.write("art/pet1_1.png", b"frame")?;
  repo.write("art/pet2_cover.png", b"cover art, not a frame")?;

  let output = run_payload(&repo.path, &["groups", "-s", "art", "--no-publish", "-k", PASSPHRASE])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  let stderr = String::from_utf8_lossy(&output.stderr);

  assert!(stdout.contains("pet2 skipped"), "stdout: {}", stdout);
  assert!(stderr.contains("skipping group"), "stderr: {}", stderr);
  assert!(repo.file_exists("art/pet1.zip.enc"));
  assert!(!repo.file_exists("art/pet2.zip.enc"));
  assert!(!repo.file_exists("art/pet2.manifest.txt"));

  Ok(())
}

#[test]
fn test_prefix_and_dest() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  seed_pets(&repo)?;

  run_payload(
    &repo.path,
    &["groups", "-s", "art", "-d", "dist", "--prefix", "sprite_", "--no-publish", "-k", PASSPHRASE],
  )?;
  assert!(repo.file_exists("dist/sprite_pet1.zip.enc"));
  assert!(repo.file_exists("dist/sprite_pet2.manifest.txt"));
  assert!(repo.read_file("dist/sprite_pet1.manifest.txt")?.starts_with("bundle: sprite_pet1\n"));

  Ok(())
}

#[test]
fn test_no_groups_is_fatal() -> Result<()> {
  if !tools_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  repo.write("art/background.png", b"no underscore")?;

  let output = run_payload_raw(&repo.path, &["groups", "-s", "art", "--no-publish", "-k", PASSPHRASE])?;
  assert_eq!(output.status.code(), Some(1));

  Ok(())
}
