//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

pub const PASSPHRASE: &str = "correct horse battery staple";

/// A git repository in a temp dir with one initial commit
pub struct TestRepo {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestRepo {
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;

    std::fs::write(path.join("README.md"), "# assets\n")?;
    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial commit"])?;

    Ok(Self { _root: root, path })
  }

  /// Write a file, creating parent directories
  pub fn write(&self, rel: &str, content: impl AsRef<[u8]>) -> Result<PathBuf> {
    let path = self.path.join(rel);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, content)?;
    Ok(path)
  }

  /// Stage everything and commit
  pub fn commit(&self, message: &str) -> Result<()> {
    git(&self.path, &["add", "-A"])?;
    git(&self.path, &["commit", "--allow-empty", "-m", message])?;
    Ok(())
  }

  /// Subject lines, newest first
  pub fn subjects(&self) -> Result<Vec<String>> {
    let output = git(&self.path, &["log", "--format=%s"])?;
    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(String::from)
        .collect(),
    )
  }

  /// Full message of HEAD
  pub fn head_message(&self) -> Result<String> {
    let output = git(&self.path, &["log", "-1", "--format=%B"])?;
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
  }

  /// Bytes of a file as committed at HEAD
  pub fn committed_bytes(&self, rel: &str) -> Result<Vec<u8>> {
    let output = git(&self.path, &["cat-file", "blob", &format!("HEAD:{}", rel)])?;
    Ok(output.stdout)
  }

  pub fn file_exists(&self, rel: &str) -> bool {
    self.path.join(rel).exists()
  }

  pub fn read_file(&self, rel: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(rel))?)
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Whether the archive and cipher tools are installed
pub fn tools_available() -> bool {
  ["zip", "openssl", "unzip"].iter().all(|tool| {
    let version_flag = if *tool == "openssl" { "version" } else { "-v" };
    Command::new(tool)
      .arg(version_flag)
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .status()
      .map(|s| s.success())
      .unwrap_or(false)
  })
}

/// Entry names inside a zip archive
pub fn zip_entries(archive: &Path) -> Result<Vec<String>> {
  let output = Command::new("unzip")
    .arg("-Z1")
    .arg(archive)
    .output()
    .context("Failed to run unzip")?;
  if !output.status.success() {
    anyhow::bail!("unzip -Z1 failed: {}", String::from_utf8_lossy(&output.stderr));
  }
  Ok(
    String::from_utf8_lossy(&output.stdout)
      .lines()
      .map(String::from)
      .collect(),
  )
}

/// Run the payload binary without judging the exit status
pub fn run_payload_raw(cwd: &Path, args: &[&str]) -> Result<Output> {
  let payload_bin = env!("CARGO_BIN_EXE_payload");

  Command::new(payload_bin)
    .current_dir(cwd)
    .args(args)
    .env_remove("PAYLOAD_PASSPHRASE")
    .env_remove("RUST_LOG")
    .stdin(Stdio::null())
    .output()
    .context("Failed to run payload")
}

/// Run the payload binary, failing on a nonzero exit
pub fn run_payload(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_payload_raw(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "payload command failed: payload {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Run a build command and parse its `--json` summary
pub fn run_payload_json(cwd: &Path, args: &[&str]) -> Result<serde_json::Value> {
  let mut full: Vec<&str> = args.to_vec();
  full.push("--json");
  let output = run_payload(cwd, &full)?;
  serde_json::from_slice(&output.stdout).context("payload --json printed invalid JSON")
}
