//! System git backend
//!
//! Every version-control operation shells out to the `git` binary with an
//! isolated environment. Paths handed to these methods are relative to the
//! work tree root.

use crate::core::error::{GitError, PackError, PackResult, ResultExt};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Git backend using system git
pub struct SystemGit {
  /// Working tree root
  pub(crate) work_tree: PathBuf,
}

impl SystemGit {
  /// Open the repository containing `path`
  pub fn open(path: &Path) -> PackResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(PackError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(PackError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(Self {
      work_tree: PathBuf::from(stdout.trim()),
    })
  }

  /// Working tree root (absolute)
  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Absolute path of the `.git` directory
  pub fn git_dir(&self) -> PackResult<PathBuf> {
    let output = self.run_checked(&["rev-parse", "--absolute-git-dir"], "git rev-parse --absolute-git-dir")?;
    Ok(PathBuf::from(String::from_utf8_lossy(&output.stdout).trim()))
  }

  /// Express an absolute path relative to the work tree
  pub fn relative_to_work_tree(&self, path: &Path) -> PackResult<PathBuf> {
    let canonical_root = self.work_tree.canonicalize().unwrap_or_else(|_| self.work_tree.clone());
    let canonical = match path.canonicalize() {
      Ok(p) => p,
      // Not created yet: resolve the parent and re-attach the file name
      Err(_) => match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
          .canonicalize()
          .map(|p| p.join(name))
          .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
      },
    };

    canonical
      .strip_prefix(&canonical_root)
      .map(Path::to_path_buf)
      .map_err(|_| {
        PackError::Git(GitError::OutsideWorkTree {
          path: path.to_path_buf(),
        })
      })
  }

  /// Run a git command and fail with `GitError::CommandFailed` on nonzero exit
  pub(crate) fn run_checked(&self, args: &[&str], description: &str) -> PackResult<Output> {
    let output = self
      .git_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to run {}", description))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(PackError::Git(GitError::CommandFailed {
        command: description.to_string(),
        stderr: stderr.to_string(),
      }));
    }

    Ok(output)
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Runs from the work tree root
  /// - Clears environment variables
  /// - Whitelists only PATH and HOME
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.work_tree);

    // Isolated environment (don't trust global config)
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
      cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
      cmd.env("HOME", home);
    }

    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII

    cmd
  }
}
