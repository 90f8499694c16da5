//! Bundle manifest (`<bundle>.manifest.txt`)
//!
//! Written in two phases: the archive section right after zipping, the
//! artifact section right after encryption.
//!
//! ```text
//! bundle: app
//! date: 2026-01-15T10:00:00Z
//! cipher: aes-256-cbc (pbkdf2, sha256)
//! src: data/js
//! # files:
//! appboot.json
//! lib/main.js
//! # sha256(zip):
//! <hex>  app.zip
//! # sha256(enc):
//! <hex>  app.zip.enc
//! # size(enc): 0.01 MB
//! ```

use crate::core::error::{PackResult, ResultExt};
use crate::pack::digest::FileDigest;
use crate::utils::path_to_git_format;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const FILES_HEADER: &str = "# files:";
const ZIP_DIGEST_HEADER: &str = "# sha256(zip):";
const ENC_DIGEST_HEADER: &str = "# sha256(enc):";

/// Everything phase 1 records
#[derive(Debug, Clone)]
pub struct ArchiveSection<'a> {
  pub bundle: &'a str,
  pub date: DateTime<Utc>,
  pub cipher: &'a str,
  pub src: &'a str,
  /// Paths as stored in the archive; sorted on write
  pub files: &'a [PathBuf],
  pub archive_name: &'a str,
  pub archive_digest: &'a FileDigest,
}

/// What a previous run recorded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedDigests {
  /// Cipher label from the header
  pub cipher: Option<String>,
  pub archive: Option<String>,
  pub artifact: Option<String>,
}

/// Render the phase-1 text
pub fn render_archive_section(section: &ArchiveSection<'_>) -> String {
  let mut files: Vec<String> = section.files.iter().map(|p| path_to_git_format(p)).collect();
  files.sort();

  let mut out = String::new();
  out.push_str(&format!("bundle: {}\n", section.bundle));
  out.push_str(&format!(
    "date: {}\n",
    section.date.to_rfc3339_opts(SecondsFormat::Secs, true)
  ));
  out.push_str(&format!("cipher: {}\n", section.cipher));
  out.push_str(&format!("src: {}\n", section.src));
  out.push_str(FILES_HEADER);
  out.push('\n');
  for file in &files {
    out.push_str(file);
    out.push('\n');
  }
  out.push_str(ZIP_DIGEST_HEADER);
  out.push('\n');
  out.push_str(&format!("{}  {}\n", section.archive_digest.sha256, section.archive_name));
  out
}

/// Render the phase-2 text
pub fn render_artifact_section(artifact_name: &str, digest: &FileDigest) -> String {
  format!(
    "{}\n{}  {}\n# size(enc): {} MB\n",
    ENC_DIGEST_HEADER,
    digest.sha256,
    artifact_name,
    digest.megabytes()
  )
}

/// Phase 1: (re)create the manifest with the archive section
pub fn write_archive_section(path: &Path, section: &ArchiveSection<'_>) -> PackResult<()> {
  fs::write(path, render_archive_section(section))
    .with_context(|| format!("Failed to write manifest {}", path.display()))
}

/// Phase 2: append the artifact section
pub fn append_artifact_section(path: &Path, artifact_name: &str, digest: &FileDigest) -> PackResult<()> {
  let mut file = OpenOptions::new()
    .append(true)
    .open(path)
    .with_context(|| format!("Failed to open manifest {}", path.display()))?;
  file
    .write_all(render_artifact_section(artifact_name, digest).as_bytes())
    .with_context(|| format!("Failed to append to manifest {}", path.display()))
}

/// Cipher label and digests recorded in an existing manifest text
pub fn parse_recorded(text: &str) -> RecordedDigests {
  let mut recorded = RecordedDigests::default();
  let mut in_header = true;
  let mut lines = text.lines();
  while let Some(line) = lines.next() {
    // File names follow "# files:" and may look like header keys
    if in_header {
      if line.trim() == FILES_HEADER {
        in_header = false;
      } else if let Some(label) = line.strip_prefix("cipher: ") {
        recorded.cipher = Some(label.trim().to_string());
      }
      continue;
    }
    let slot = match line.trim() {
      ZIP_DIGEST_HEADER => &mut recorded.archive,
      ENC_DIGEST_HEADER => &mut recorded.artifact,
      _ => continue,
    };
    *slot = lines
      .next()
      .and_then(|l| l.split_whitespace().next())
      .map(|d| d.to_string());
  }
  recorded
}

/// Digests recorded in the manifest at `path`, `None` if there is no manifest
pub fn read_recorded(path: &Path) -> PackResult<Option<RecordedDigests>> {
  if !path.is_file() {
    return Ok(None);
  }
  let text = fs::read_to_string(path).with_context(|| format!("Failed to read manifest {}", path.display()))?;
  Ok(Some(parse_recorded(&text)))
}
