pub mod system_git;
mod system_git_ops;

pub use system_git::SystemGit;

/// Upstream tracking branch of the current branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
  pub remote: String,
  pub branch: String,
}
