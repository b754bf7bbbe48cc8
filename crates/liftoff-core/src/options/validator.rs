//! Per-option value validators

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ConfigError, Result};

/// Check applied to a supplied option value.
///
/// Validators may also rewrite the value (see [`Validator::StripSuffix`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Validator {
    /// The path must exist
    PathExists { label: String },

    /// The path must be an existing directory
    Directory { label: String },

    /// The path must be an existing directory bundle carrying an extension,
    /// like `App.xcworkspace`
    Bundle {
        label: String,
        extension: String,
        kind_name: String,
    },

    /// Remove a trailing suffix from the value; never fails
    StripSuffix { suffix: String },
}

impl Validator {
    pub fn path_exists(label: impl Into<String>) -> Self {
        Self::PathExists {
            label: label.into(),
        }
    }

    pub fn directory(label: impl Into<String>) -> Self {
        Self::Directory {
            label: label.into(),
        }
    }

    pub fn bundle(
        label: impl Into<String>,
        extension: impl Into<String>,
        kind_name: impl Into<String>,
    ) -> Self {
        Self::Bundle {
            label: label.into(),
            extension: extension.into(),
            kind_name: kind_name.into(),
        }
    }

    pub fn strip_suffix(suffix: impl Into<String>) -> Self {
        Self::StripSuffix {
            suffix: suffix.into(),
        }
    }

    /// Validate a value for `key`, returning the value to store
    pub fn apply(&self, key: &str, value: Value) -> Result<Value> {
        let Some(raw) = value.as_str() else {
            return Err(ConfigError::TypeMismatch {
                key: key.to_string(),
                expected: "string".to_string(),
                actual: value.to_string(),
            });
        };
        debug!(key, value = raw, validator = ?self, "validating option");

        let path = Path::new(raw);
        match self {
            Self::PathExists { label } => {
                if !path.exists() {
                    return Err(not_found(key, label, path));
                }
            }
            Self::Directory { label } => {
                if !path.is_dir() {
                    return Err(not_found(key, label, path));
                }
            }
            Self::Bundle {
                label,
                extension,
                kind_name,
            } => {
                if !path.exists() {
                    return Err(not_found(key, &format!("{} file", label), path));
                }
                if !path.is_dir() {
                    return Err(ConfigError::invalid(key, format!("{} file invalid", label)));
                }
                if !raw.contains(extension.as_str()) {
                    return Err(ConfigError::invalid(
                        key,
                        format!(
                            "{} file is not a {}, must end with {}",
                            label, kind_name, extension
                        ),
                    ));
                }
            }
            Self::StripSuffix { suffix } => {
                let stripped = raw.strip_suffix(suffix.as_str()).unwrap_or(raw);
                return Ok(Value::String(stripped.to_string()));
            }
        }

        Ok(value)
    }
}

fn not_found(key: &str, label: &str, path: &Path) -> ConfigError {
    ConfigError::invalid(
        key,
        format!("{} not found at path '{}'", label, expand_path(path).display()),
    )
}

/// Absolute form of a path for error messages
fn expand_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
