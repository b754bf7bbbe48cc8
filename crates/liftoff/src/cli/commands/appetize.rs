//! Appetize command - build for the simulator and upload a preview

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use clap::Args;
use console::style;
use serde_json::{Map, Value};
use tracing::{debug, info};

use liftoff_actions::scratch::default_scratch_dir;
use liftoff_actions::xcodebuild::BUILD_SETTINGS_KEY;
use liftoff_actions::{
    Action, AppetizeClient, AppetizeConfig, BuildAndUploadParams, BuildAndUploadRunner,
    BuildAndUploadToAppetize, UploadError, Xcodebuild, ZipCompressor,
};
use liftoff_core::config::{load_config_or_default, AppetizeSection};
use liftoff_core::{EnvSource, OptionSources, ProcessEnv};

use crate::cli::output;
use crate::cli::Cli;

/// Prefix addressing a single build setting in `-x`
const BUILD_SETTING_PREFIX: &str = "build_settings.";

/// Build the app for the iOS simulator and upload it to Appetize
#[derive(Debug, Args)]
pub struct AppetizeCommand {
    /// Scheme to build (a scheme passed through --xcodebuild wins)
    #[arg(short, long)]
    pub scheme: Option<String>,

    /// xcodebuild parameter as KEY=VALUE, repeatable. Use build_settings.NAME=VALUE for build settings
    #[arg(short = 'x', long = "xcodebuild", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub xcodebuild: Vec<(String, Value)>,

    /// Where per-run build directories are created; only those are removed
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Directory the public key file is written to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Appetize API token [env: APPETIZE_API_TOKEN]
    #[arg(long)]
    pub api_token: Option<String>,

    /// Appetize API host [env: APPETIZE_API_HOST]
    #[arg(long)]
    pub api_host: Option<String>,

    /// Update the app with this public key instead of creating a new one [env: APPETIZE_PUBLIC_KEY]
    #[arg(long)]
    pub public_key: Option<String>,

    /// Note shown in the Appetize dashboard [env: APPETIZE_NOTE]
    #[arg(long)]
    pub note: Option<String>,
}

/// Flag values layered over another environment
struct FlagEnv<'a> {
    flags: HashMap<&'static str, String>,
    fallback: &'a dyn EnvSource,
}

impl EnvSource for FlagEnv<'_> {
    fn var(&self, name: &str) -> Option<String> {
        self.flags
            .get(name)
            .cloned()
            .or_else(|| self.fallback.var(name))
    }
}

/// Parse a `KEY=VALUE` pair; `true` and `false` become booleans
pub fn parse_key_value(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{}`", s))?;

    let key = key.trim();
    if key.is_empty() || key == BUILD_SETTING_PREFIX {
        return Err(format!("invalid KEY=VALUE: empty key in `{}`", s));
    }

    let value = match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => Value::String(other.to_string()),
    };
    Ok((key.to_string(), value))
}

/// Merge `-x` pairs into an xcodebuild map
pub fn apply_overrides(map: &mut Map<String, Value>, pairs: &[(String, Value)]) {
    for (key, value) in pairs {
        match key.strip_prefix(BUILD_SETTING_PREFIX) {
            Some(setting) => {
                let entry = map
                    .entry(BUILD_SETTINGS_KEY.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                if let Value::Object(settings) = entry {
                    settings.insert(setting.to_string(), value.clone());
                }
            }
            None => {
                map.insert(key.clone(), value.clone());
            }
        }
    }
}

impl AppetizeCommand {
    /// Execute the appetize command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(
            scheme = ?self.scheme,
            overrides = self.xcodebuild.len(),
            "executing appetize command"
        );
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<()> {
        let cwd = std::env::current_dir()?;
        let (config, config_path) = load_config_or_default(&cwd)?;
        if let Some(ref path) = config_path {
            debug!(path = %path.display(), "using config file");
        }
        let section = &config.build_and_upload;

        let params = self.resolve_params(&config.build_and_upload.xcodebuild, section.scheme.as_deref())?;

        let appetize = self.appetize_config(&ProcessEnv, &config.appetize)?;

        let scratch_dir = self
            .scratch_dir
            .clone()
            .or_else(|| section.scratch_dir.clone())
            .unwrap_or_else(default_scratch_dir);
        let output_dir = self
            .output_dir
            .clone()
            .or_else(|| section.output_dir.clone())
            .unwrap_or_else(|| cwd.clone());

        let builder = Xcodebuild::new().with_working_dir(&cwd);
        let uploader = AppetizeClient::new(appetize);
        let runner = BuildAndUploadRunner::new(&builder, &ZipCompressor, &uploader)
            .with_scratch_dir(scratch_dir)
            .with_output_dir(output_dir);

        if cli.shows_text() {
            println!();
            println!("{}", output::header("Building for the iOS simulator..."));
            println!(
                "  Command: {}",
                style(runner.prepare_options(&params).command_line()).dim()
            );
            println!(
                "  Upload: {}",
                output::path_style().apply_to(uploader.config().upload_url())
            );
            println!();
        }

        let result = runner.run(&params).await?;

        if cli.format == crate::cli::OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else if !cli.quiet {
            output::success(&format!(
                "Generated Public Key: {}",
                style(&result.upload.public_key).green()
            ));
            println!(
                "{}",
                output::key_value("Key file", &result.key_file.display().to_string())
            );
            println!("{}", output::key_value("SHA-256", &result.archive_sha256));
            if let Some(ref url) = result.upload.public_url {
                println!("{}", output::key_value("Preview", url));
            }
        }

        Ok(())
    }

    /// Appetize settings from flags, then `APPETIZE_*` variables, then the
    /// config file section
    fn appetize_config(
        &self,
        env: &dyn EnvSource,
        section: &AppetizeSection,
    ) -> Result<AppetizeConfig, UploadError> {
        let flags = [
            ("APPETIZE_API_TOKEN", &self.api_token),
            ("APPETIZE_API_HOST", &self.api_host),
            ("APPETIZE_PUBLIC_KEY", &self.public_key),
            ("APPETIZE_NOTE", &self.note),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.clone().map(|v| (name, v)))
        .collect();

        let layered = FlagEnv {
            flags,
            fallback: env,
        };
        Ok(AppetizeConfig::from_env(&layered)?.with_section(section))
    }

    /// Resolve the action options from flags, the config file and defaults
    fn resolve_params(
        &self,
        file_xcodebuild: &BTreeMap<String, Value>,
        file_scheme: Option<&str>,
    ) -> anyhow::Result<BuildAndUploadParams> {
        let options = BuildAndUploadToAppetize.available_options()?;

        let mut file_values = BTreeMap::new();
        if let Some(scheme) = file_scheme {
            file_values.insert("scheme".to_string(), Value::String(scheme.to_string()));
        }
        if !file_xcodebuild.is_empty() {
            file_values.insert(
                "xcodebuild".to_string(),
                Value::Object(file_xcodebuild.clone().into_iter().collect()),
            );
        }

        let env = ProcessEnv;
        let mut sources = OptionSources::new(&env).with_file_values(file_values);
        if let Some(ref scheme) = self.scheme {
            sources = sources.with_value("scheme", scheme.clone());
        }
        if !self.xcodebuild.is_empty() {
            let mut merged: Map<String, Value> = file_xcodebuild.clone().into_iter().collect();
            apply_overrides(&mut merged, &self.xcodebuild);
            sources = sources.with_value("xcodebuild", Value::Object(merged));
        }

        let resolved = options.resolve(&sources)?;
        Ok(BuildAndUploadParams::from_resolved(&resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn command(args: &[&str]) -> AppetizeCommand {
        let mut argv = vec!["liftoff", "appetize"];
        argv.extend_from_slice(args);
        let cli = <Cli as clap::Parser>::try_parse_from(argv).unwrap();
        match cli.command {
            crate::cli::Commands::Appetize(cmd) => cmd,
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("configuration=Debug").unwrap(),
            ("configuration".to_string(), json!("Debug"))
        );
        assert_eq!(
            parse_key_value("clean=true").unwrap(),
            ("clean".to_string(), json!(true))
        );
        assert_eq!(
            parse_key_value("destination=platform=iOS Simulator,name=iPhone 15").unwrap(),
            (
                "destination".to_string(),
                json!("platform=iOS Simulator,name=iPhone 15")
            )
        );
        assert!(parse_key_value("noequals").is_err());
        assert!(parse_key_value("=value").is_err());
        assert!(parse_key_value("build_settings.=x").is_err());
    }

    #[test]
    fn test_overrides_nest_build_settings() {
        let mut map = Map::new();
        map.insert("configuration".to_string(), json!("Release"));

        apply_overrides(
            &mut map,
            &[
                ("configuration".to_string(), json!("Debug")),
                ("build_settings.CODE_SIGNING_ALLOWED".to_string(), json!("NO")),
                ("build_settings.ONLY_ACTIVE_ARCH".to_string(), json!("YES")),
            ],
        );

        assert_eq!(map["configuration"], json!("Debug"));
        assert_eq!(
            map[BUILD_SETTINGS_KEY],
            json!({ "CODE_SIGNING_ALLOWED": "NO", "ONLY_ACTIVE_ARCH": "YES" })
        );
    }

    #[test]
    fn test_flags_parse() {
        let cmd = command(&[
            "-s",
            "MyApp",
            "-x",
            "workspace=./MyApp.xcworkspace",
            "--xcodebuild",
            "clean=true",
            "--api-token",
            "tok",
        ]);
        assert_eq!(cmd.scheme.as_deref(), Some("MyApp"));
        assert_eq!(cmd.xcodebuild.len(), 2);
        assert_eq!(cmd.xcodebuild[1], ("clean".to_string(), json!(true)));
        assert_eq!(cmd.api_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_appetize_flags_win_over_environment() {
        let mut env = HashMap::new();
        env.insert("APPETIZE_API_TOKEN".to_string(), "tok_env".to_string());
        env.insert("APPETIZE_NOTE".to_string(), "from env".to_string());

        let cmd = command(&["--api-token", "tok_flag", "--api-host", "https://example.test/"]);
        let config = cmd.appetize_config(&env, &AppetizeSection::default()).unwrap();

        assert_eq!(config.api_token, "tok_flag");
        assert_eq!(config.api_host, "https://example.test");
        assert_eq!(config.note.as_deref(), Some("from env"));
    }

    #[test]
    fn test_appetize_token_from_environment() {
        let mut env = HashMap::new();
        env.insert("APPETIZE_API_TOKEN".to_string(), "tok_env".to_string());

        let section = AppetizeSection {
            public_key: Some("pub_file".to_string()),
            ..Default::default()
        };
        let config = command(&[]).appetize_config(&env, &section).unwrap();

        assert_eq!(config.api_token, "tok_env");
        assert_eq!(config.public_key.as_deref(), Some("pub_file"));
    }

    #[test]
    fn test_appetize_token_required() {
        let env: HashMap<String, String> = HashMap::new();
        let err = command(&[])
            .appetize_config(&env, &AppetizeSection::default())
            .unwrap_err();
        assert!(matches!(err, UploadError::ConfigurationError(_)));

        let err = command(&["--api-token", ""])
            .appetize_config(&env, &AppetizeSection::default())
            .unwrap_err();
        assert!(matches!(err, UploadError::ConfigurationError(_)));
    }

    #[test]
    fn test_flags_override_file_values() {
        let cmd = command(&["-s", "FromFlag", "-x", "configuration=Debug"]);

        let mut file = BTreeMap::new();
        file.insert("workspace".to_string(), json!("./MyApp.xcworkspace"));
        file.insert("configuration".to_string(), json!("Release"));

        let params = cmd.resolve_params(&file, Some("FromFile")).unwrap();
        assert_eq!(params.scheme.as_deref(), Some("FromFlag"));
        assert_eq!(params.xcodebuild.get_str("configuration"), Some("Debug"));
        assert_eq!(
            params.xcodebuild.get_str("workspace"),
            Some("./MyApp.xcworkspace")
        );
    }

    #[test]
    fn test_file_values_used_without_flags() {
        let cmd = command(&[]);

        let mut file = BTreeMap::new();
        file.insert("configuration".to_string(), json!("Release"));

        let params = cmd.resolve_params(&file, Some("FromFile")).unwrap();
        assert_eq!(params.scheme.as_deref(), Some("FromFile"));
        assert_eq!(params.xcodebuild.get_str("configuration"), Some("Release"));

        let params = cmd.resolve_params(&BTreeMap::new(), None).unwrap();
        assert!(params.scheme.is_none());
        assert!(params.xcodebuild.is_empty());
    }
}
