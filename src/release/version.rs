//! Release versions derived from commit subjects
//!
//! The only source of truth is the subject line of earlier release commits:
//! `<prefix> v<major>.<minor>` for single-bundle releases and
//! `<prefix> version <major>.<minor>` for per-group releases. The newest
//! matching subject wins. File contents are never consulted, so versions only
//! stay monotonic while release commits are not rewritten.

use crate::core::error::{PackError, PackResult};
use crate::core::vcs::SystemGit;
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// (major, minor); ordering compares major first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VersionTag {
  pub major: u32,
  pub minor: u32,
}

impl VersionTag {
  /// Version used when no release commit exists yet
  pub const INITIAL: VersionTag = VersionTag { major: 1, minor: 1 };

  pub fn new(major: u32, minor: u32) -> Self {
    Self { major, minor }
  }

  /// Parse `<major>.<minor>`, coercing malformed parts (major -> 1, minor -> 0)
  ///
  /// Never fails: a damaged history entry must not block a release.
  pub fn parse_lenient(numeral: &str) -> Self {
    let (major, minor) = match numeral.split_once('.') {
      Some((major, minor)) => (major, Some(minor)),
      None => (numeral, None),
    };
    Self {
      major: major.parse().unwrap_or(1),
      minor: minor.and_then(|m| m.parse().ok()).unwrap_or(0),
    }
  }
}

impl fmt::Display for VersionTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.major, self.minor)
  }
}

/// Next release after `prior`: minor + 1, or 1.1 for the first release
///
/// A minor at `u32::MAX` rolls over into the next major. The result is always
/// strictly greater than `prior`; the one tag with no successor is an error.
pub fn next_version(prior: Option<VersionTag>) -> PackResult<VersionTag> {
  let Some(tag) = prior else {
    return Ok(VersionTag::INITIAL);
  };
  if let Some(minor) = tag.minor.checked_add(1) {
    return Ok(VersionTag::new(tag.major, minor));
  }
  tag
    .major
    .checked_add(1)
    .map(|major| VersionTag::new(major, 0))
    .ok_or_else(|| PackError::message(format!("Release version {} has no successor", tag)))
}

/// The two release conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseKind {
  /// One bundle for the whole source tree
  Bundle,
  /// One bundle per filename group, one version for the whole run
  Groups,
}

/// A release kind together with its configured subject prefix
#[derive(Debug, Clone)]
pub struct ReleaseLine {
  pub kind: ReleaseKind,
  pub prefix: String,
}

impl ReleaseLine {
  pub fn new(kind: ReleaseKind, prefix: impl Into<String>) -> Self {
    Self {
      kind,
      prefix: prefix.into(),
    }
  }

  fn marker(&self) -> &'static str {
    match self.kind {
      ReleaseKind::Bundle => " v",
      ReleaseKind::Groups => " version ",
    }
  }

  /// Commit subject for a release of `version`
  pub fn subject(&self, version: VersionTag) -> String {
    format!("{}{}{}", self.prefix, self.marker(), version)
  }

  /// Matches this line's subjects; the numeral must contain a dot or be all digits
  fn pattern(&self) -> PackResult<Regex> {
    let pattern = format!(
      r"^{}{}([^\s.]*\.\S*|\d+)(\s|$)",
      regex::escape(&self.prefix),
      regex::escape(self.marker())
    );
    Regex::new(&pattern).map_err(|e| PackError::message(format!("Invalid release prefix '{}': {}", self.prefix, e)))
  }

  /// Newest version recorded in `subjects` (ordered newest first)
  pub fn latest_in<'a, I>(&self, subjects: I) -> PackResult<Option<VersionTag>>
  where
    I: IntoIterator<Item = &'a str>,
  {
    let pattern = self.pattern()?;
    Ok(
      subjects
        .into_iter()
        .find_map(|subject| pattern.captures(subject.trim_end()))
        .and_then(|caps| caps.get(1))
        .map(|numeral| VersionTag::parse_lenient(numeral.as_str())),
    )
  }
}

/// Reads release history from the repository
pub struct VersionResolver<'a> {
  git: &'a SystemGit,
}

impl<'a> VersionResolver<'a> {
  pub fn new(git: &'a SystemGit) -> Self {
    Self { git }
  }

  /// Last released version for `line`, `None` when there is no release yet
  pub fn resolve(&self, line: &ReleaseLine) -> PackResult<Option<VersionTag>> {
    let subjects = self.git.commit_subjects()?;
    let found = line.latest_in(subjects.iter().map(String::as_str))?;
    tracing::debug!(kind = ?line.kind, prior = ?found, "resolved release history");
    Ok(found)
  }

  /// Version the next release of `line` gets
  pub fn next(&self, line: &ReleaseLine) -> PackResult<VersionTag> {
    next_version(self.resolve(line)?)
  }
}
