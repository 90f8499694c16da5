use crate::core::error::{ConfigError, PackError, PackResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for payload
/// Searched in order: payload.toml, .payload.toml, .config/payload.toml
///
/// Every section is optional; a missing file is the same as an empty one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackConfig {
  #[serde(default)]
  pub bundle: BundleConfig,
  #[serde(default)]
  pub groups: GroupsConfig,
  #[serde(default)]
  pub cipher: CipherConfig,
  #[serde(default)]
  pub publish: PublishConfig,
}

/// Single-bundle mode settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
  /// Default output name (`<name>.zip.enc`)
  #[serde(default = "default_bundle_name")]
  pub name: String,

  /// Extensions collected from the source tree (no leading dot)
  #[serde(default = "default_bundle_extensions")]
  pub extensions: Vec<String>,

  /// Commit subject prefix: `<prefix> v<major>.<minor>`
  #[serde(default = "default_bundle_prefix")]
  pub release_prefix: String,
}

fn default_bundle_name() -> String {
  "app".to_string()
}

fn default_bundle_extensions() -> Vec<String> {
  vec!["json".to_string(), "js".to_string()]
}

fn default_bundle_prefix() -> String {
  "payload".to_string()
}

impl Default for BundleConfig {
  fn default() -> Self {
    Self {
      name: default_bundle_name(),
      extensions: default_bundle_extensions(),
      release_prefix: default_bundle_prefix(),
    }
  }
}

/// Per-group mode settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupsConfig {
  /// Frame extension (`<key>_<index>.<ext>`)
  #[serde(default = "default_group_extension")]
  pub extension: String,

  /// Commit subject prefix: `<prefix> version <major>.<minor>`
  #[serde(default = "default_group_prefix")]
  pub release_prefix: String,
}

fn default_group_extension() -> String {
  "png".to_string()
}

fn default_group_prefix() -> String {
  "assets".to_string()
}

impl Default for GroupsConfig {
  fn default() -> Self {
    Self {
      extension: default_group_extension(),
      release_prefix: default_group_prefix(),
    }
  }
}

/// Cipher settings handed to `openssl enc`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CipherConfig {
  #[serde(default = "default_cipher_id")]
  pub id: String,

  /// PBKDF2 digest; fixed per repository so old artifacts stay decryptable
  #[serde(default = "default_cipher_digest")]
  pub digest: String,

  /// PBKDF2 iteration count (openssl default when unset)
  #[serde(default)]
  pub iterations: Option<u32>,
}

fn default_cipher_id() -> String {
  "aes-256-cbc".to_string()
}

fn default_cipher_digest() -> String {
  "sha256".to_string()
}

impl Default for CipherConfig {
  fn default() -> Self {
    Self {
      id: default_cipher_id(),
      digest: default_cipher_digest(),
      iterations: None,
    }
  }
}

/// Publish settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
  /// Extension of the encrypted artifact, guarded against LFS filters
  #[serde(default = "default_artifact_extension")]
  pub artifact_extension: String,

  /// Environment variable consulted for the passphrase
  #[serde(default = "default_passphrase_env")]
  pub passphrase_env: String,
}

fn default_artifact_extension() -> String {
  "enc".to_string()
}

fn default_passphrase_env() -> String {
  "PAYLOAD_PASSPHRASE".to_string()
}

impl Default for PublishConfig {
  fn default() -> Self {
    Self {
      artifact_extension: default_artifact_extension(),
      passphrase_env: default_passphrase_env(),
    }
  }
}

/// Identifier accepted by openssl as a cipher or digest name
pub fn validate_tool_identifier(field: &str, value: &str) -> PackResult<()> {
  if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
    return Err(PackError::Config(ConfigError::InvalidField {
      field: field.to_string(),
      reason: format!("'{}' must be non-empty and contain only letters, digits and '-'", value),
    }));
  }
  Ok(())
}

fn validate_extension(field: &str, ext: &str) -> PackResult<()> {
  if ext.is_empty() || ext.starts_with('.') || ext.contains(['/', '\\']) {
    return Err(PackError::Config(ConfigError::InvalidField {
      field: field.to_string(),
      reason: format!("'{}' must be a bare extension such as 'json'", ext),
    }));
  }
  Ok(())
}

fn validate_non_empty(field: &str, value: &str) -> PackResult<()> {
  if value.trim().is_empty() {
    return Err(PackError::Config(ConfigError::InvalidField {
      field: field.to_string(),
      reason: "must not be empty".to_string(),
    }));
  }
  Ok(())
}

impl PackConfig {
  /// Find config file in search order: payload.toml, .payload.toml, .config/payload.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = [
      path.join("payload.toml"),
      path.join(".payload.toml"),
      path.join(".config").join("payload.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config, falling back to defaults when no file exists
  pub fn load(path: &Path) -> PackResult<Self> {
    let Some(config_path) = Self::find_config_path(path) else {
      return Ok(Self::default());
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: PackConfig = toml_edit::de::from_str(&content)
      .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config
      .validate()
      .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;

    Ok(config)
  }

  /// Validate every field the pipeline hands to external tools or uses as a pattern
  pub fn validate(&self) -> PackResult<()> {
    validate_non_empty("bundle.name", &self.bundle.name)?;
    if self.bundle.extensions.is_empty() {
      return Err(PackError::Config(ConfigError::InvalidField {
        field: "bundle.extensions".to_string(),
        reason: "at least one extension is required".to_string(),
      }));
    }
    for ext in &self.bundle.extensions {
      validate_extension("bundle.extensions", ext)?;
    }
    validate_non_empty("bundle.release_prefix", &self.bundle.release_prefix)?;

    validate_extension("groups.extension", &self.groups.extension)?;
    validate_non_empty("groups.release_prefix", &self.groups.release_prefix)?;

    validate_tool_identifier("cipher.id", &self.cipher.id)?;
    validate_tool_identifier("cipher.digest", &self.cipher.digest)?;
    if self.cipher.iterations == Some(0) {
      return Err(PackError::Config(ConfigError::InvalidField {
        field: "cipher.iterations".to_string(),
        reason: "must be at least 1".to_string(),
      }));
    }

    validate_extension("publish.artifact_extension", &self.publish.artifact_extension)?;
    validate_non_empty("publish.passphrase_env", &self.publish.passphrase_env)?;
    Ok(())
  }

  /// Apply a `--cipher` flag on top of the file value
  pub fn override_cipher(&mut self, id: Option<&str>) -> PackResult<()> {
    if let Some(id) = id {
      validate_tool_identifier("--cipher", id)?;
      self.cipher.id = id.to_string();
    }
    Ok(())
  }
}
