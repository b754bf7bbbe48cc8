//! Configuration validation

use serde_json::Value;
use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::Config;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_appetize(config)?;
    validate_build_and_upload(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_appetize(config: &Config) -> Result<()> {
    let appetize = &config.appetize;

    if appetize.api_token.is_some() {
        return Err(ConfigError::invalid(
            "appetize.api_token",
            "tokens are read from APPETIZE_API_TOKEN or --api-token, remove it from the config file",
        ));
    }

    if let Some(ref host) = appetize.api_host {
        if !host.starts_with("https://") && !host.starts_with("http://") {
            return Err(ConfigError::invalid(
                "appetize.api_host",
                "must start with http:// or https://",
            ));
        }
    }

    if let Some(ref platform) = appetize.platform {
        let valid_platforms = ["ios", "android"];
        if !valid_platforms.contains(&platform.as_str()) {
            return Err(ConfigError::invalid(
                "appetize.platform",
                format!("must be one of: {}", valid_platforms.join(", ")),
            ));
        }
    }

    Ok(())
}

fn validate_build_and_upload(config: &Config) -> Result<()> {
    let section = &config.build_and_upload;

    if section.scheme.as_deref() == Some("") {
        return Err(ConfigError::invalid(
            "build_and_upload.scheme",
            "scheme cannot be empty",
        ));
    }

    for (key, value) in &section.xcodebuild {
        let valid = match key.as_str() {
            "build_settings" => value.is_object(),
            _ => matches!(value, Value::String(_) | Value::Bool(_) | Value::Number(_)),
        };
        if !valid {
            return Err(ConfigError::invalid(
                format!("build_and_upload.xcodebuild.{}", key),
                "unsupported value type",
            ));
        }
    }

    Ok(())
}
