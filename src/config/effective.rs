//! Effective configuration with provenance
//!
//! Captures the merged configuration together with the sources that
//! contributed to it, so a staged publication can be traced back to the
//! files it was built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::descriptor::OrgDefaults;
use crate::repository::RepositorySettings;
use crate::version_mapping::VersionMappingRules;

/// Schema version for effective_config.json
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "klog-publish/effective_config@1";

/// Repo config location relative to the project root
pub const DEFAULT_REPO_CONFIG: &str = ".klog/publish.toml";

/// User config location relative to `$HOME`
pub const USER_CONFIG_SUFFIX: &str = ".config/klog-publish/config.toml";

/// Keys that contain secrets and should be redacted
const SECRET_KEYS: &[&str] = &["password", "token", "secret", "signing_key", "credential"];

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    User,
    Repo,
    Cli,
}

/// A contributing config source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Typed view of the merged configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishSettings {
    pub pom: OrgDefaults,
    pub repository: RepositorySettings,
    #[serde(default)]
    pub version_mapping: VersionMappingRules,
}

/// Effective configuration with full provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_version: u32,
    pub schema_id: String,
    pub created_at: DateTime<Utc>,

    /// Build id (set once the build starts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,

    /// Redacted key paths
    pub redactions: Vec<String>,
}

impl EffectiveConfig {
    /// Build effective config from layers.
    ///
    /// Missing files are skipped; unreadable or malformed ones are errors.
    pub fn build(
        user_config_path: Option<&Path>,
        repo_config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        let file_layers = [
            (ConfigOrigin::User, user_config_path),
            (ConfigOrigin::Repo, repo_config_path),
        ];
        for (origin, path) in file_layers {
            let Some(path) = path else { continue };
            if !path.exists() {
                debug!(path = %path.display(), ?origin, "config layer not present");
                continue;
            }
            let (value, digest) = Self::load_toml_file(path)?;
            debug!(path = %path.display(), ?origin, %digest, "loaded config layer");
            layers.push(value);
            sources.push(ConfigSource {
                origin,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let mut merged = merge_layers(layers);
        let redactions = Self::redact_secrets(&mut merged);
        Self::validate_config(&merged)?;

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            build_id: None,
            config: merged,
            sources,
            redactions,
        })
    }

    /// Default user config path, if `$HOME` is set.
    pub fn default_user_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(USER_CONFIG_SUFFIX))
    }

    /// Deserialize the typed settings.
    pub fn settings(&self) -> Result<PublishSettings, ConfigError> {
        serde_json::from_value(self.config.clone())
            .map_err(|e| ConfigError::ValidationError(format!("invalid settings: {}", e)))
    }

    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("invalid UTF-8: {}", e)))?;
        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

        Ok((Self::toml_to_json(toml_value), digest))
    }

    fn toml_to_json(toml: toml::Value) -> Value {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Number(i.into()),
            toml::Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(arr) => Value::Array(arr.into_iter().map(Self::toml_to_json).collect()),
            toml::Value::Table(table) => Value::Object(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect(),
            ),
        }
    }

    fn redact_secrets(value: &mut Value) -> Vec<String> {
        let mut redactions = Vec::new();
        Self::redact_recursive(value, String::new(), &mut redactions);
        redactions
    }

    fn redact_recursive(value: &mut Value, path: String, redactions: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let current_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", path, key)
                    };

                    let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));
                    if is_secret && !val.is_object() && !val.is_array() {
                        *val = Value::String("[REDACTED]".to_string());
                        redactions.push(current_path);
                    } else {
                        Self::redact_recursive(val, current_path, redactions);
                    }
                }
            }
            Value::Array(arr) => {
                for (i, val) in arr.iter_mut().enumerate() {
                    Self::redact_recursive(val, format!("{}[{}]", path, i), redactions);
                }
            }
            _ => {}
        }
    }

    fn validate_config(config: &Value) -> Result<(), ConfigError> {
        let repository = config
            .pointer("/pom/repository")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if repository.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "pom.repository must be a non-empty 'owner/name' slug".to_string(),
            ));
        }

        for key in ["nexus_url", "snapshot_url"] {
            let url = config
                .pointer(&format!("/repository/{}", key))
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::ValidationError(format!(
                    "repository.{} must be an http(s) URL, got '{}'",
                    key, url
                )));
            }
        }

        Ok(())
    }

    /// Set build context
    pub fn with_build_id(mut self, build_id: String) -> Self {
        self.build_id = Some(build_id);
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)
    }

    /// Get a config value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }
}

/// Parse a `key.path=value` CLI override into a nested JSON object.
///
/// `true`/`false` become booleans, `null` clears the key, anything else
/// is a string.
pub fn parse_override(raw: &str) -> Result<Value, ConfigError> {
    let (path, value) = raw
        .split_once('=')
        .ok_or_else(|| ConfigError::ParseError(format!("override '{}' is not key=value", raw)))?;

    let path = path.trim();
    if path.is_empty() || path.split('.').any(|p| p.is_empty()) {
        return Err(ConfigError::ParseError(format!("invalid override key '{}'", path)));
    }

    let leaf = match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        other => Value::String(other.to_string()),
    };

    Ok(path.rsplit('.').fold(leaf, |acc, key| {
        let mut map = serde_json::Map::new();
        map.insert(key.to_string(), acc);
        Value::Object(map)
    }))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
