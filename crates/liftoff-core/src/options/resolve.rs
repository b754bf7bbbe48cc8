//! Option resolution: precedence, coercion and validation

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};

use super::descriptor::OptionSet;
use super::env::EnvSource;

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Explicit,
    Env,
    File,
    Default,
}

impl ValueSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Env => "env",
            Self::File => "file",
            Self::Default => "default",
        }
    }
}

/// Raw inputs for resolving an option table.
///
/// Precedence per key: explicit > environment > config file > default.
pub struct OptionSources<'a> {
    explicit: BTreeMap<String, Value>,
    file: BTreeMap<String, Value>,
    env: &'a dyn EnvSource,
}

impl<'a> OptionSources<'a> {
    pub fn new(env: &'a dyn EnvSource) -> Self {
        Self {
            explicit: BTreeMap::new(),
            file: BTreeMap::new(),
            env,
        }
    }

    /// Add an explicitly supplied value (CLI flag, caller argument)
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.explicit.insert(key.into(), value.into());
        self
    }

    /// Add several explicit values
    pub fn with_values<I, K>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.explicit
            .extend(values.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Add values read from a config file section
    pub fn with_file_values(mut self, values: BTreeMap<String, Value>) -> Self {
        self.file.extend(values);
        self
    }
}

/// Validated option values
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedOptions {
    values: BTreeMap<String, Value>,
    #[serde(skip)]
    sources: BTreeMap<String, ValueSource>,
}

impl ResolvedOptions {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Boolean value, `false` when unset
    pub fn bool(&self, key: &str) -> bool {
        self.values
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn map(&self, key: &str) -> Option<&Map<String, Value>> {
        self.values.get(key).and_then(Value::as_object)
    }

    pub fn path(&self, key: &str) -> Option<PathBuf> {
        self.string(key).map(PathBuf::from)
    }

    pub fn source(&self, key: &str) -> Option<ValueSource> {
        self.sources.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl OptionSet {
    /// Resolve every option from the given sources and validate the results
    pub fn resolve(&self, sources: &OptionSources<'_>) -> Result<ResolvedOptions> {
        for key in sources.explicit.keys().chain(sources.file.keys()) {
            if self.get(key).is_none() {
                return Err(ConfigError::UnknownOption {
                    key: key.clone(),
                    available: self.keys(),
                });
            }
        }

        let mut resolved = ResolvedOptions::default();

        for item in self.iter() {
            let key = item.key.as_str();

            let candidate = if let Some(value) = sources.explicit.get(key) {
                Some((value.clone(), ValueSource::Explicit))
            } else if let Some(raw) = item
                .env_name
                .as_deref()
                .and_then(|name| sources.env.var(name))
                .filter(|raw| !raw.is_empty())
            {
                Some((item.kind.parse(key, &raw)?, ValueSource::Env))
            } else if let Some(value) = sources.file.get(key) {
                Some((value.clone(), ValueSource::File))
            } else {
                item.default_value
                    .clone()
                    .map(|value| (value, ValueSource::Default))
            };

            let Some((value, source)) = candidate.filter(|(value, _)| !value.is_null()) else {
                if !item.optional {
                    return Err(ConfigError::MissingField(item.key.clone()));
                }
                continue;
            };

            let value = item.kind.coerce(key, value)?;
            let value = match &item.validator {
                Some(validator) => validator.apply(key, value)?,
                None => value,
            };

            debug!(key, ?source, "resolved option");
            resolved.values.insert(item.key.clone(), value);
            resolved.sources.insert(item.key.clone(), source);
        }

        info!(count = resolved.len(), "options resolved");
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OptionDescriptor, Validator, ValueKind};
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn table() -> OptionSet {
        OptionSet::new(vec![
            OptionDescriptor::new("scheme", "Scheme")
                .short("-s")
                .env("TEST_SCHEME")
                .optional(),
            OptionDescriptor::new("configuration", "Configuration")
                .env("TEST_CONFIGURATION")
                .default_value("Release"),
            OptionDescriptor::new("clean", "Clean first")
                .env("TEST_CLEAN")
                .kind(ValueKind::Bool)
                .default_value(false),
            OptionDescriptor::new("output_name", "Name")
                .optional()
                .validator(Validator::strip_suffix(".ipa")),
        ])
        .unwrap()
    }

    #[test]
    fn test_defaults_apply() {
        let env = HashMap::new();
        let resolved = table().resolve(&OptionSources::new(&env)).unwrap();

        assert_eq!(resolved.string("configuration"), Some("Release"));
        assert!(!resolved.bool("clean"));
        assert_eq!(resolved.string("scheme"), None);
        assert_eq!(resolved.source("configuration"), Some(ValueSource::Default));
    }

    #[test]
    fn test_precedence() {
        let mut env = HashMap::new();
        env.insert("TEST_SCHEME".to_string(), "FromEnv".to_string());
        env.insert("TEST_CONFIGURATION".to_string(), "Debug".to_string());

        let mut file = BTreeMap::new();
        file.insert("configuration".to_string(), json!("Staging"));
        file.insert("output_name".to_string(), json!("FromFile"));

        let sources = OptionSources::new(&env)
            .with_value("scheme", "Explicit")
            .with_file_values(file);
        let resolved = table().resolve(&sources).unwrap();

        assert_eq!(resolved.string("scheme"), Some("Explicit"));
        assert_eq!(resolved.source("scheme"), Some(ValueSource::Explicit));
        assert_eq!(resolved.string("configuration"), Some("Debug"));
        assert_eq!(resolved.source("configuration"), Some(ValueSource::Env));
        assert_eq!(resolved.string("output_name"), Some("FromFile"));
        assert_eq!(resolved.source("output_name"), Some(ValueSource::File));
    }

    #[test]
    fn test_env_bool_parsed() {
        let mut env = HashMap::new();
        env.insert("TEST_CLEAN".to_string(), "yes".to_string());

        let resolved = table().resolve(&OptionSources::new(&env)).unwrap();
        assert!(resolved.bool("clean"));
    }

    #[test]
    fn test_explicit_string_coerced_to_bool() {
        let env = HashMap::new();
        let sources = OptionSources::new(&env).with_value("clean", "true");
        let resolved = table().resolve(&sources).unwrap();
        assert!(resolved.bool("clean"));
    }

    #[test]
    fn test_unknown_option_rejected() {
        let env = HashMap::new();
        let sources = OptionSources::new(&env).with_value("nope", "x");
        let err = table().resolve(&sources).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOption { ref key, .. } if key == "nope"));
    }

    #[test]
    fn test_missing_required() {
        let set = OptionSet::new(vec![OptionDescriptor::new("api_token", "Token")]).unwrap();
        let env = HashMap::new();
        let err = set.resolve(&OptionSources::new(&env)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref k) if k == "api_token"));
    }

    #[test]
    fn test_output_name_stripped() {
        let env = HashMap::new();
        let sources = OptionSources::new(&env).with_value("output_name", "MyApp.ipa");
        let resolved = table().resolve(&sources).unwrap();
        assert_eq!(resolved.string("output_name"), Some("MyApp"));
    }

    #[test]
    fn test_validator_runs_on_env_values() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.mobileprovision");

        let set = OptionSet::new(vec![OptionDescriptor::new("profile", "Profile")
            .env("TEST_PROFILE")
            .optional()
            .validator(Validator::path_exists("Provisioning profile"))])
        .unwrap();

        let mut env = HashMap::new();
        env.insert(
            "TEST_PROFILE".to_string(),
            missing.to_string_lossy().to_string(),
        );

        assert!(set.resolve(&OptionSources::new(&env)).is_err());
    }

    #[test]
    fn test_empty_env_ignored() {
        let mut env = HashMap::new();
        env.insert("TEST_CONFIGURATION".to_string(), String::new());
        let resolved = table().resolve(&OptionSources::new(&env)).unwrap();
        assert_eq!(resolved.string("configuration"), Some("Release"));
    }
}
