//! External tool invocation (zip, openssl)
//!
//! Same isolation rules as the git backend: cleared environment with PATH and
//! HOME whitelisted. Calls block until the tool exits; there is no timeout.

use crate::core::error::{PackResult, PipelineError};
use std::path::Path;
use std::process::{Command, Stdio};

/// Build an isolated command for `program`, running in `cwd` when given
pub fn tool_cmd(program: &str, cwd: Option<&Path>) -> Command {
  let mut cmd = Command::new(program);
  if let Some(dir) = cwd {
    cmd.current_dir(dir);
  }

  cmd.env_clear();
  if let Ok(path) = std::env::var("PATH") {
    cmd.env("PATH", path);
  }
  if let Ok(home) = std::env::var("HOME") {
    cmd.env("HOME", home);
  }
  cmd
}

/// Argument that makes each known tool print something and exit 0
fn version_arg(tool: &str) -> &'static str {
  match tool {
    "openssl" => "version",
    "zip" => "-v",
    _ => "--version",
  }
}

/// Whether `tool` can be spawned and answers its version query
pub fn is_available(tool: &str) -> bool {
  tool_cmd(tool, None)
    .arg(version_arg(tool))
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .status()
    .map(|s| s.success())
    .unwrap_or(false)
}

/// Fail with `MissingTool` for the first tool that is not installed
pub fn require(tools: &[&str]) -> PackResult<()> {
  for tool in tools {
    if !is_available(tool) {
      return Err(
        PipelineError::MissingTool {
          tool: (*tool).to_string(),
        }
        .into(),
      );
    }
  }
  Ok(())
}
