//! appboot.json version bump
//!
//! The descriptor shipped inside the bundle carries an app version and a model
//! version. Before a build both are bumped in place: the app version by its last
//! number, the model version to today's date when it is date-based.

use crate::core::error::{PackError, PackResult, ResultExt};
use chrono::{Local, NaiveDate};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static DOTTED_NUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+(\.\d+)*$").expect("valid regex"));
static TRAILING_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.*?)(\d+)$").expect("valid regex"));
static DATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("valid regex"));

/// Bump the last number of a version string
///
/// `1.2.3` -> `1.2.4`, `build7` -> `build8`, `""` -> `1.0.0`, `beta` -> `beta.1`
pub fn bump_semver(version: &str) -> String {
  let s = version.trim();
  if s.is_empty() {
    return "1.0.0".to_string();
  }

  if DOTTED_NUMERIC.is_match(s) {
    let mut parts: Vec<u128> = s.split('.').filter_map(|p| p.parse().ok()).collect();
    if let Some(last) = parts.last_mut() {
      *last = last.saturating_add(1);
    }
    return parts.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(".");
  }

  if let Some(caps) = TRAILING_NUMBER.captures(s)
    && let Ok(num) = caps[2].parse::<u128>()
  {
    return format!("{}{}", &caps[1], num.saturating_add(1));
  }

  format!("{}.1", s)
}

/// Date-based model versions move to `today` (suffix kept); others bump like the app
pub fn bump_model_version(version: &str, today: NaiveDate) -> String {
  if DATE_PREFIX.is_match(version) {
    let suffix = version.get(10..).unwrap_or("");
    return format!("{}{}", today.format("%Y-%m-%d"), suffix);
  }
  bump_semver(version)
}

/// Before/after versions of one bump
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppbootBump {
  pub path: PathBuf,
  pub app_version: (String, String),
  pub model_version: (String, String),
  pub backup: Option<PathBuf>,
}

fn read_version(obj: &serde_json::Map<String, Value>, camel: &str, snake: &str) -> String {
  let value = match obj.get(camel) {
    Some(v) if !is_blank(v) => Some(v),
    _ => obj.get(snake),
  };
  match value {
    Some(Value::String(s)) => s.clone(),
    Some(Value::Null) | None => String::new(),
    Some(other) => other.to_string(),
  }
}

fn is_blank(v: &Value) -> bool {
  match v {
    Value::Null => true,
    Value::String(s) => s.is_empty(),
    _ => false,
  }
}

/// Write back under the existing spelling; camelCase when neither exists
fn write_version(obj: &mut serde_json::Map<String, Value>, camel: &str, snake: &str, version: String) {
  if obj.contains_key(camel) || !obj.contains_key(snake) {
    obj.insert(camel.to_string(), Value::String(version));
  } else {
    obj.insert(snake.to_string(), Value::String(version));
  }
}

/// Bump both versions in the descriptor at `path`, keeping a timestamped backup
pub fn bump_appboot(path: &Path) -> PackResult<AppbootBump> {
  let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
  let mut doc: Value =
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))?;
  let obj = doc
    .as_object_mut()
    .ok_or_else(|| PackError::message(format!("{} must contain a JSON object", path.display())))?;

  let now = Local::now();
  let current_app = read_version(obj, "appVersion", "app_version");
  let current_model = read_version(obj, "modelVersion", "model_version");
  let next_app = bump_semver(&current_app);
  let next_model = bump_model_version(&current_model, now.date_naive());

  write_version(obj, "appVersion", "app_version", next_app.clone());
  write_version(obj, "modelVersion", "model_version", next_model.clone());

  let mut backup_name = path.as_os_str().to_os_string();
  backup_name.push(format!(".bak.{}", now.format("%Y%m%d-%H%M%S")));
  let backup = PathBuf::from(backup_name);
  fs::write(&backup, &text).with_context(|| format!("Failed to write backup {}", backup.display()))?;

  let mut out = serde_json::to_string_pretty(&doc)?;
  out.push('\n');
  fs::write(path, out).with_context(|| format!("Failed to write {}", path.display()))?;

  tracing::info!(app = %next_app, model = %next_model, "bumped {}", path.display());
  Ok(AppbootBump {
    path: path.to_path_buf(),
    app_version: (current_app, next_app),
    model_version: (current_model, next_model),
    backup: Some(backup),
  })
}
