//! Option descriptors and option tables

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::error::{ConfigError, Result};

use super::validator::Validator;

/// Type of value an option accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Plain string (paths, names)
    String,
    /// Boolean flag
    Bool,
    /// Nested key/value parameters
    Map,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Map => "map",
        }
    }

    /// Check whether an already-typed value fits this kind
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Bool => value.is_boolean(),
            Self::Map => value.is_object(),
        }
    }

    /// Parse a raw string (from a flag or environment variable) into a value
    pub fn parse(&self, key: &str, raw: &str) -> Result<Value> {
        match self {
            Self::String => Ok(Value::String(raw.to_string())),
            Self::Bool => parse_bool(raw)
                .map(Value::Bool)
                .ok_or_else(|| ConfigError::TypeMismatch {
                    key: key.to_string(),
                    expected: self.as_str().to_string(),
                    actual: format!("'{}'", raw),
                }),
            Self::Map => {
                let value: Value = serde_json::from_str(raw).map_err(|e| {
                    ConfigError::invalid(key, format!("expected a JSON object: {}", e))
                })?;
                if value.is_object() {
                    Ok(value)
                } else {
                    Err(ConfigError::TypeMismatch {
                        key: key.to_string(),
                        expected: self.as_str().to_string(),
                        actual: describe(&value).to_string(),
                    })
                }
            }
        }
    }

    /// Coerce a value coming from a loosely typed source.
    ///
    /// Strings are parsed for bool and map options so that `"true"` from a
    /// flag or a config file behaves like `true`.
    pub fn coerce(&self, key: &str, value: Value) -> Result<Value> {
        if self.accepts(&value) {
            return Ok(value);
        }
        match (self, &value) {
            (Self::Bool | Self::Map, Value::String(raw)) => self.parse(key, raw),
            _ => Err(ConfigError::TypeMismatch {
                key: key.to_string(),
                expected: self.as_str().to_string(),
                actual: describe(&value).to_string(),
            }),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

/// A single configurable parameter of an action
#[derive(Debug, Clone, Serialize)]
pub struct OptionDescriptor {
    /// Option key (e.g. `workspace`)
    pub key: String,

    /// Short command line flag (e.g. `-w`)
    pub short_option: Option<String>,

    /// Environment variable that can supply the value
    pub env_name: Option<String>,

    /// Human readable description
    pub description: String,

    /// Value used when no source provides one
    pub default_value: Option<Value>,

    /// Whether the option may stay unset
    pub optional: bool,

    /// Accepted value type
    pub kind: ValueKind,

    /// Check (and possibly rewrite) supplied values
    pub validator: Option<Validator>,
}

impl OptionDescriptor {
    /// Create a required string option
    pub fn new(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            short_option: None,
            env_name: None,
            description: description.into(),
            default_value: None,
            optional: false,
            kind: ValueKind::String,
            validator: None,
        }
    }

    pub fn short(mut self, flag: impl Into<String>) -> Self {
        self.short_option = Some(flag.into());
        self
    }

    pub fn env(mut self, name: impl Into<String>) -> Self {
        self.env_name = Some(name.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.default_value = if value.is_null() { None } else { Some(value) };
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Render the default for display, empty when there is none
    pub fn default_display(&self) -> String {
        match &self.default_value {
            None => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Ordered table of option descriptors
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct OptionSet {
    items: Vec<OptionDescriptor>,
}

impl OptionSet {
    /// Build a table, rejecting duplicate keys or short flags
    pub fn new(items: Vec<OptionDescriptor>) -> Result<Self> {
        let mut keys = HashSet::new();
        let mut flags = HashSet::new();

        for item in &items {
            if !keys.insert(item.key.as_str()) {
                return Err(ConfigError::DuplicateOption(item.key.clone()));
            }
            if let Some(ref flag) = item.short_option {
                if !flags.insert(flag.as_str()) {
                    return Err(ConfigError::DuplicateOption(flag.clone()));
                }
            }
        }

        Ok(Self { items })
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionDescriptor> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a descriptor by key
    pub fn get(&self, key: &str) -> Option<&OptionDescriptor> {
        self.items.iter().find(|item| item.key == key)
    }

    /// Look up a descriptor by its short flag (with or without the dash)
    pub fn by_short(&self, flag: &str) -> Option<&OptionDescriptor> {
        let flag = flag.trim_start_matches('-');
        self.items.iter().find(|item| {
            item.short_option
                .as_deref()
                .map(|s| s.trim_start_matches('-') == flag)
                .unwrap_or(false)
        })
    }

    /// Comma separated list of keys, used in error messages
    pub fn keys(&self) -> String {
        self.items
            .iter()
            .map(|item| item.key.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Default value of every option that has one
    pub fn defaults(&self) -> BTreeMap<String, Value> {
        self.items
            .iter()
            .filter_map(|item| {
                item.default_value
                    .clone()
                    .map(|value| (item.key.clone(), value))
            })
            .collect()
    }
}
