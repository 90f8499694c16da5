//! Passphrase resolution
//!
//! Providers are tried in order and the first one that yields a non-blank
//! value wins: explicit value, passphrase file, environment, interactive
//! prompt. Keeping the order in one list makes the precedence testable without
//! touching the real environment or terminal.

use crate::core::error::{PackError, PackResult, PipelineError, ResultExt};
use std::fmt;
use std::io::IsTerminal;
use std::path::PathBuf;

/// Secret handed to the cipher; never printed
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(String);

impl Passphrase {
  pub fn new(value: impl Into<String>) -> Self {
    Self(value.into())
  }

  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for Passphrase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Passphrase(***)")
  }
}

fn non_blank(value: String) -> Option<Passphrase> {
  if value.trim().is_empty() { None } else { Some(Passphrase::new(value)) }
}

/// One place a passphrase can come from
pub trait PassphraseProvider {
  /// Short name used in logs
  fn source(&self) -> &'static str;

  /// `Ok(None)` means "not here, try the next provider"
  fn provide(&self) -> PackResult<Option<Passphrase>>;
}

/// `-k/--passphrase`
pub struct ExplicitValue(pub Option<String>);

impl PassphraseProvider for ExplicitValue {
  fn source(&self) -> &'static str {
    "argument"
  }

  fn provide(&self) -> PackResult<Option<Passphrase>> {
    Ok(self.0.clone().and_then(non_blank))
  }
}

/// `--passphrase-file`: first line of the file, line ending stripped
pub struct PassphraseFile(pub Option<PathBuf>);

impl PassphraseProvider for PassphraseFile {
  fn source(&self) -> &'static str {
    "passphrase file"
  }

  fn provide(&self) -> PackResult<Option<Passphrase>> {
    let Some(path) = &self.0 else {
      return Ok(None);
    };
    let content =
      std::fs::read_to_string(path).with_context(|| format!("Failed to read passphrase file {}", path.display()))?;
    let first = content.lines().next().unwrap_or("").to_string();
    Ok(non_blank(first))
  }
}

/// Environment variable (a `.env` file is loaded into the environment at startup)
pub struct EnvironmentVar {
  name: String,
  lookup: fn(&str) -> Option<String>,
}

impl EnvironmentVar {
  pub fn new(name: impl Into<String>) -> Self {
    Self::with_lookup(name, |key| std::env::var(key).ok())
  }

  /// Same provider with a custom lookup
  pub fn with_lookup(name: impl Into<String>, lookup: fn(&str) -> Option<String>) -> Self {
    Self {
      name: name.into(),
      lookup,
    }
  }
}

impl PassphraseProvider for EnvironmentVar {
  fn source(&self) -> &'static str {
    "environment"
  }

  fn provide(&self) -> PackResult<Option<Passphrase>> {
    Ok((self.lookup)(&self.name).and_then(non_blank))
  }
}

/// Hidden terminal prompt; silently absent when stdin is not a terminal
pub struct InteractivePrompt {
  /// Ask twice (encryption) so a typo cannot lock the artifact
  pub confirm: bool,
}

impl PassphraseProvider for InteractivePrompt {
  fn source(&self) -> &'static str {
    "prompt"
  }

  fn provide(&self) -> PackResult<Option<Passphrase>> {
    if !std::io::stdin().is_terminal() {
      return Ok(None);
    }

    let mut prompt = dialoguer::Password::new().with_prompt("Passphrase");
    if self.confirm {
      prompt = prompt.with_confirmation("Repeat passphrase", "Passphrases do not match");
    }
    let value = prompt
      .interact()
      .map_err(|e| PackError::message(format!("Failed to read passphrase: {}", e)))?;
    Ok(non_blank(value))
  }
}

/// Ordered list of providers
#[derive(Default)]
pub struct PassphraseChain {
  providers: Vec<Box<dyn PassphraseProvider>>,
}

impl PassphraseChain {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a provider (lower precedence than everything before it)
  pub fn with(mut self, provider: impl PassphraseProvider + 'static) -> Self {
    self.providers.push(Box::new(provider));
    self
  }

  /// argument -> file -> environment -> prompt
  pub fn standard(explicit: Option<String>, file: Option<PathBuf>, env_name: &str, confirm: bool) -> Self {
    Self::new()
      .with(ExplicitValue(explicit))
      .with(PassphraseFile(file))
      .with(EnvironmentVar::new(env_name))
      .with(InteractivePrompt { confirm })
  }

  /// First passphrase any provider yields, with the provider's name
  pub fn resolve(&self) -> PackResult<(Passphrase, &'static str)> {
    for provider in &self.providers {
      if let Some(pass) = provider.provide()? {
        tracing::debug!(source = provider.source(), "passphrase resolved");
        return Ok((pass, provider.source()));
      }
    }
    Err(PipelineError::NoPassphrase.into())
  }
}
