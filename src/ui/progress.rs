//! Progress indicators for per-group runs
//!
//! Uses `linya`, which draws on stderr. Nothing is drawn when stderr is not a
//! terminal, so piped and `--json` output stays clean.

use linya::{Bar, Progress};
use std::io::IsTerminal;

/// One bar counting finished bundles
pub struct GroupProgress {
  inner: Option<(Progress, Bar)>,
}

impl GroupProgress {
  /// Bar over `total` bundles; inert unless stderr is a terminal and `enabled`
  pub fn new(total: usize, label: impl Into<String>, enabled: bool) -> Self {
    if !enabled || total == 0 || !std::io::stderr().is_terminal() {
      return Self { inner: None };
    }
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self {
      inner: Some((progress, bar)),
    }
  }

  /// Mark one bundle built or reused; skipped groups never count
  pub fn inc(&mut self) {
    if let Some((progress, bar)) = self.inner.as_mut() {
      progress.inc_and_draw(bar, 1);
    }
  }

  #[cfg(test)]
  pub fn is_drawing(&self) -> bool {
    self.inner.is_some()
  }
}
