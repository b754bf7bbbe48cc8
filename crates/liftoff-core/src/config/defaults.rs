//! Default configuration values

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "liftoff.yaml";

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "liftoff.toml";

/// Alternative configuration file name
pub const ALT_CONFIG_FILE: &str = ".liftoff.yaml";

/// Default Appetize API host
pub const DEFAULT_APPETIZE_HOST: &str = "https://api.appetize.io";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_YAML,
        DEFAULT_CONFIG_TOML,
        ALT_CONFIG_FILE,
        ".liftoff.toml",
    ]
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# liftoff configuration
# The Appetize API token is read from APPETIZE_API_TOKEN, never from this file.

appetize:
  api_host: https://api.appetize.io
  platform: ios

build_and_upload:
  xcodebuild:
    configuration: Debug

gym:
  configuration: Release
  output_directory: "."
"#;
