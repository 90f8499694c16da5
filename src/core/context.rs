//! Run context - build once in main, pass everywhere
//!
//! ```text
//! main.rs:
//!   RunContext::build(cwd) -> &RunContext
//!   |
//!   v
//! commands/bundle.rs, groups.rs, decrypt.rs:
//!   fn run_*(ctx: &RunContext, ..)
//! ```

use crate::core::config::PackConfig;
use crate::core::error::{GitError, PackError, PackResult};
use crate::core::vcs::SystemGit;
use std::path::{Path, PathBuf};

/// Shared state for one invocation
pub struct RunContext {
  /// Directory the command was started from (absolute)
  pub cwd: PathBuf,

  /// payload.toml merged over defaults
  pub config: PackConfig,

  /// Repository handle; `None` outside a repository
  pub git: Option<SystemGit>,
}

impl RunContext {
  /// Locate the repository (if any) and load its configuration
  pub fn build(cwd: &Path) -> PackResult<Self> {
    let git = match SystemGit::open(cwd) {
      Ok(git) => Some(git),
      Err(PackError::Git(GitError::RepoNotFound { .. })) => None,
      Err(e) => {
        tracing::debug!(error = %e, "no usable repository");
        None
      }
    };
    let root = git
      .as_ref()
      .map(|g| g.work_tree().to_path_buf())
      .unwrap_or_else(|| cwd.to_path_buf());
    let config = PackConfig::load(&root)?;

    Ok(Self {
      cwd: cwd.to_path_buf(),
      config,
      git,
    })
  }

  /// Context with an explicit config
  #[cfg(test)]
  pub fn with_config(cwd: &Path, config: PackConfig) -> Self {
    Self {
      cwd: cwd.to_path_buf(),
      config,
      git: SystemGit::open(cwd).ok(),
    }
  }

  /// Repository handle, or an error for commands that publish
  pub fn require_git(&self) -> PackResult<&SystemGit> {
    self.git.as_ref().ok_or_else(|| {
      PackError::Git(GitError::RepoNotFound {
        path: self.cwd.clone(),
      })
    })
  }

  /// Resolve a user-supplied path against the working directory
  pub fn resolve(&self, path: &Path) -> PathBuf {
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.cwd.join(path)
    }
  }
}
