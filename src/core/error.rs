//! Error types for payload with contextual messages and exit codes
//!
//! Every fatal condition in a run maps onto one `PackError`. Pipeline failures
//! carry the tool status where one exists so the operator sees what the archiver
//! or cipher actually reported.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, arguments, missing or empty source)
  User = 1,
  /// System error (git, zip, openssl, I/O)
  System = 2,
  /// Validation failure (pointer stub about to be committed)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for payload
#[derive(Debug)]
pub enum PackError {
  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Archive / cipher / publish pipeline errors
  Pipeline(PipelineError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl PackError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    PackError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    PackError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      PackError::Message { message, context, help } => PackError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      PackError::Io(err) => PackError::Message {
        message: format!("I/O error: {}", err),
        context: Some(ctx_str),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      PackError::Config(_) => ExitCode::User,
      PackError::Git(_) => ExitCode::System,
      PackError::Pipeline(e) => e.exit_code(),
      PackError::Io(_) => ExitCode::System,
      PackError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      PackError::Config(e) => e.help_message(),
      PackError::Git(e) => e.help_message(),
      PackError::Pipeline(e) => e.help_message(),
      PackError::Message { help, .. } => help.clone(),
      PackError::Io(_) => None,
    }
  }
}

impl fmt::Display for PackError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PackError::Config(e) => write!(f, "{}", e),
      PackError::Git(e) => write!(f, "{}", e),
      PackError::Pipeline(e) => write!(f, "{}", e),
      PackError::Io(e) => write!(f, "I/O error: {}", e),
      PackError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for PackError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      PackError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for PackError {
  fn from(err: io::Error) -> Self {
    PackError::Io(err)
  }
}

impl From<String> for PackError {
  fn from(msg: String) -> Self {
    PackError::message(msg)
  }
}

impl From<&str> for PackError {
  fn from(msg: &str) -> Self {
    PackError::message(msg)
  }
}

impl From<PipelineError> for PackError {
  fn from(err: PipelineError) -> Self {
    PackError::Pipeline(err)
  }
}

impl From<GitError> for PackError {
  fn from(err: GitError) -> Self {
    PackError::Git(err)
  }
}

impl From<ConfigError> for PackError {
  fn from(err: ConfigError) -> Self {
    PackError::Config(err)
  }
}

impl From<toml_edit::de::Error> for PackError {
  fn from(err: toml_edit::de::Error) -> Self {
    PackError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for PackError {
  fn from(err: serde_json::Error) -> Self {
    PackError::message(format!("JSON error: {}", err))
  }
}

impl From<walkdir::Error> for PackError {
  fn from(err: walkdir::Error) -> Self {
    PackError::message(format!("Directory walk error: {}", err))
  }
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
  /// A field holds a value payload cannot use
  InvalidField { field: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::InvalidField { .. } => {
        Some("Fix the value in payload.toml or override it on the command line.".to_string())
      }
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::InvalidField { field, reason } => {
        write!(f, "Invalid config value for '{}': {}", field, reason)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// Path lies outside the repository work tree
  OutsideWorkTree { path: PathBuf },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::RepoNotFound { path } => Some(format!(
        "Run payload inside a git repository, or pass --no-publish to build without publishing ({})",
        path.display()
      )),
      GitError::OutsideWorkTree { .. } => {
        Some("Choose a --dest directory inside the repository, or pass --no-publish.".to_string())
      }
      GitError::CommandFailed { .. } => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::OutsideWorkTree { path } => {
        write!(f, "Path is outside the repository work tree: {}", path.display())
      }
    }
  }
}

/// Pipeline errors: everything between asset discovery and the commit
#[derive(Debug)]
pub enum PipelineError {
  /// No qualifying input files (or no groups) under the source root
  EmptySource { root: PathBuf, wanted: String },

  /// Source root does not exist or is not a directory
  SourceNotFound { root: PathBuf },

  /// A required external tool is not installed
  MissingTool { tool: String },

  /// The archiver exited nonzero
  ArchiveBuild { archive: PathBuf, status: Option<i32>, stderr: String },

  /// Key derivation or cipher failure (includes a wrong passphrase on decrypt)
  Crypto { status: Option<i32>, stderr: String },

  /// No passphrase from any provider
  NoPassphrase,

  /// An artifact about to be committed is a large-file-storage pointer
  PointerStubDetected { path: PathBuf },
}

impl PipelineError {
  fn exit_code(&self) -> ExitCode {
    match self {
      PipelineError::EmptySource { .. } | PipelineError::SourceNotFound { .. } | PipelineError::NoPassphrase => {
        ExitCode::User
      }
      PipelineError::MissingTool { .. } | PipelineError::ArchiveBuild { .. } | PipelineError::Crypto { .. } => {
        ExitCode::System
      }
      PipelineError::PointerStubDetected { .. } => ExitCode::Validation,
    }
  }

  fn help_message(&self) -> Option<String> {
    match self {
      PipelineError::EmptySource { wanted, .. } => Some(format!("Add {} files to the source directory or pass --src.", wanted)),
      PipelineError::MissingTool { tool } => Some(format!("Install '{}' and make sure it is on PATH.", tool)),
      PipelineError::Crypto { .. } => Some("Check the passphrase and the --cipher value.".to_string()),
      PipelineError::NoPassphrase => Some(
        "Pass -k/--passphrase, --passphrase-file, or set the passphrase environment variable (PAYLOAD_PASSPHRASE by default)."
          .to_string(),
      ),
      PipelineError::PointerStubDetected { .. } => Some(
        "The file holds an LFS pointer, not encrypted bytes. Rebuild it (delete it and rerun) after running `git lfs untrack`."
          .to_string(),
      ),
      PipelineError::SourceNotFound { .. } | PipelineError::ArchiveBuild { .. } => None,
    }
  }
}

fn fmt_status(status: &Option<i32>) -> String {
  match status {
    Some(code) => format!("exit status {}", code),
    None => "terminated by signal".to_string(),
  }
}

impl fmt::Display for PipelineError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PipelineError::EmptySource { root, wanted } => {
        write!(f, "No {} found under {}", wanted, root.display())
      }
      PipelineError::SourceNotFound { root } => {
        write!(f, "Source directory not found: {}", root.display())
      }
      PipelineError::MissingTool { tool } => write!(f, "Required tool not found: {}", tool),
      PipelineError::ArchiveBuild { archive, status, stderr } => {
        write!(
          f,
          "zip failed for {} ({})\n{}",
          archive.display(),
          fmt_status(status),
          stderr.trim()
        )
      }
      PipelineError::Crypto { status, stderr } => {
        write!(f, "openssl failed ({})\n{}", fmt_status(status), stderr.trim())
      }
      PipelineError::NoPassphrase => write!(f, "No passphrase available"),
      PipelineError::PointerStubDetected { path } => {
        write!(f, "Refusing to commit LFS pointer stub: {}", path.display())
      }
    }
  }
}

/// Result type alias for payload
pub type PackResult<T> = Result<T, PackError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> PackResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> PackResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<PackError>,
{
  fn context(self, ctx: impl Into<String>) -> PackResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> PackResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &PackError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
