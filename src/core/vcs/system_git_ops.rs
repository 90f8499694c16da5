//! Additional operations for SystemGit (history, attributes, index, remotes)

use super::Upstream;
use super::system_git::SystemGit;
use crate::core::error::{GitError, PackError, PackResult, ResultExt};
use crate::utils::path_to_git_format;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;

impl SystemGit {
  /// Commit subject lines, most recent first
  ///
  /// An unborn branch (no commits yet) has no history and yields an empty list.
  pub fn commit_subjects(&self) -> PackResult<Vec<String>> {
    let output = self
      .git_cmd()
      .args(["log", "--format=%s"])
      .output()
      .context("Failed to run git log")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("does not have any commits") || stderr.contains("unknown revision") {
        return Ok(Vec::new());
      }
      return Err(PackError::Git(GitError::CommandFailed {
        command: "git log --format=%s".to_string(),
        stderr: stderr.to_string(),
      }));
    }

    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|s| s.to_string())
        .collect(),
    )
  }

  /// Resolved `filter` attribute for a path (`None` when unspecified or unset)
  pub fn filter_attribute(&self, path: &Path) -> PackResult<Option<String>> {
    let git_path = path_to_git_format(path);
    let output = self.run_checked(&["check-attr", "filter", "--", &git_path], "git check-attr filter")?;

    // Format: "<path>: filter: <value>"
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value = stdout
      .lines()
      .next()
      .and_then(|line| line.rsplit(": ").next())
      .map(|v| v.trim().to_string())
      .unwrap_or_default();

    match value.as_str() {
      "" | "unspecified" | "unset" => Ok(None),
      _ => Ok(Some(value)),
    }
  }

  /// Whether the path is currently in the index
  pub fn is_tracked(&self, path: &Path) -> PackResult<bool> {
    let git_path = path_to_git_format(path);
    let output = self
      .git_cmd()
      .args(["ls-files", "--error-unmatch", "--", &git_path])
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .status()
      .context("Failed to run git ls-files")?;
    Ok(output.success())
  }

  /// Drop a path from the index, keeping the working-tree file
  pub fn untrack(&self, path: &Path) -> PackResult<()> {
    let git_path = path_to_git_format(path);
    self.run_checked(
      &["rm", "--cached", "--quiet", "--ignore-unmatch", "--", &git_path],
      "git rm --cached",
    )?;
    Ok(())
  }

  /// Stage a path as it is on disk, even when an ignore rule matches it
  pub fn track(&self, path: &Path) -> PackResult<()> {
    let git_path = path_to_git_format(path);
    self.run_checked(&["add", "--force", "--", &git_path], "git add --force")?;
    Ok(())
  }

  /// Restore the index entry of a path to HEAD
  pub fn reset_path(&self, path: &Path) -> PackResult<()> {
    let git_path = path_to_git_format(path);
    self.run_checked(&["reset", "--quiet", "--", &git_path], "git reset")?;
    Ok(())
  }

  /// Stage whatever happened to a path, deletion included
  pub fn stage_path_state(&self, path: &Path) -> PackResult<()> {
    let git_path = path_to_git_format(path);
    self.run_checked(&["add", "--all", "--", &git_path], "git add --all")?;
    Ok(())
  }

  /// Leading bytes of the blob staged for a path
  pub fn staged_blob_prefix(&self, path: &Path, len: usize) -> PackResult<Vec<u8>> {
    let spec = format!(":{}", path_to_git_format(path));
    let output = self.run_checked(&["cat-file", "blob", &spec], "git cat-file blob")?;
    let mut bytes = output.stdout;
    bytes.truncate(len);
    Ok(bytes)
  }

  /// Whether the index differs from HEAD for any of `paths`
  ///
  /// Entries outside `paths` are ignored; whatever else the operator staged is
  /// not part of a release.
  pub fn has_staged_changes<P: AsRef<Path>>(&self, paths: &[P]) -> PackResult<bool> {
    if paths.is_empty() {
      return Ok(false);
    }
    let git_paths: Vec<String> = paths.iter().map(|p| path_to_git_format(p.as_ref())).collect();
    let status = self
      .git_cmd()
      .args(["--literal-pathspecs", "diff", "--cached", "--quiet", "--"])
      .args(&git_paths)
      .status()
      .context("Failed to run git diff --cached")?;

    // --quiet exits 1 when there are differences
    match status.code() {
      Some(0) => Ok(false),
      Some(1) => Ok(true),
      _ => Err(PackError::Git(GitError::CommandFailed {
        command: "git diff --cached --quiet".to_string(),
        stderr: format!("unexpected status {:?}", status.code()),
      })),
    }
  }

  /// Commit only `paths` with a message read from stdin; returns the new HEAD sha
  ///
  /// Other staged entries stay staged and out of the commit.
  pub fn commit<P: AsRef<Path>>(&self, message: &str, paths: &[P]) -> PackResult<String> {
    let git_paths: Vec<String> = paths.iter().map(|p| path_to_git_format(p.as_ref())).collect();
    let mut child = self
      .git_cmd()
      .args(["--literal-pathspecs", "commit", "--quiet", "--file=-", "--only", "--"])
      .args(&git_paths)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .context("Failed to run git commit")?;

    if let Some(mut stdin) = child.stdin.take() {
      stdin
        .write_all(message.as_bytes())
        .context("Failed to write commit message")?;
    }

    let output = child.wait_with_output().context("Failed to wait for git commit")?;
    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(PackError::Git(GitError::CommandFailed {
        command: "git commit --only".to_string(),
        stderr: stderr.to_string(),
      }));
    }

    let head = self.run_checked(&["rev-parse", "HEAD"], "git rev-parse HEAD")?;
    Ok(String::from_utf8_lossy(&head.stdout).trim().to_string())
  }

  /// Upstream of the current branch, if one is configured
  pub fn upstream(&self) -> PackResult<Option<Upstream>> {
    let output = self
      .git_cmd()
      .args(["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{upstream}"])
      .output()
      .context("Failed to resolve upstream")?;

    if !output.status.success() {
      return Ok(None);
    }

    // Format: "origin/main" (the branch part may itself contain slashes)
    let full = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let remotes = self.run_checked(&["remote"], "git remote")?;
    let remotes = String::from_utf8_lossy(&remotes.stdout).to_string();

    let upstream = remotes
      .lines()
      .map(str::trim)
      .filter(|remote| !remote.is_empty())
      .filter_map(|remote| {
        full
          .strip_prefix(remote)
          .and_then(|rest| rest.strip_prefix('/'))
          .map(|branch| Upstream {
            remote: remote.to_string(),
            branch: branch.to_string(),
          })
      })
      .max_by_key(|u| u.remote.len());

    Ok(upstream)
  }

  /// Push HEAD to a remote branch
  pub fn push_to_remote(&self, remote_name: &str, branch: &str) -> PackResult<()> {
    let refspec = format!("HEAD:{}", branch);
    let output = self
      .git_cmd()
      .args(["push", remote_name, &refspec])
      .output()
      .context("Failed to push")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(PackError::Git(GitError::CommandFailed {
        command: format!("git push {} {}", remote_name, refspec),
        stderr: stderr.to_string(),
      }));
    }

    Ok(())
  }
}
