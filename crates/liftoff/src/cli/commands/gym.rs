//! Gym command - inspect and validate packaging options

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use liftoff_actions::{gym_options, Chooser, GymConfig};
use liftoff_core::config::load_config_or_default;
use liftoff_core::{OptionSet, OptionSources, ProcessEnv, ValueSource};

use crate::cli::output;
use crate::cli::prompt;
use crate::cli::{Cli, OutputFormat};

/// Packaging option management
#[derive(Debug, Args)]
pub struct GymCommand {
    #[command(subcommand)]
    pub subcommand: GymSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum GymSubcommand {
    /// Print the option table with detected defaults
    Options {
        /// Never prompt; several workspaces or projects are an error
        #[arg(long)]
        no_input: bool,
    },

    /// Resolve and validate the options and show the resulting build
    Check(CheckArgs),
}

/// Explicit option values.
///
/// `-h` and `-q` from the option table are only available in long form here
/// since they collide with `--help` and the global `--quiet`.
#[derive(Debug, Default, Args)]
pub struct CheckArgs {
    /// Path the workspace file
    #[arg(short = 'w', long)]
    pub workspace: Option<PathBuf>,

    /// Path the project file
    #[arg(short = 'p', long)]
    pub project: Option<PathBuf>,

    /// The path to the provisioning profile
    #[arg(long)]
    pub provisioning_profile_path: Option<PathBuf>,

    /// The project's scheme
    #[arg(short = 's', long)]
    pub scheme: Option<String>,

    /// Clean the project before building it
    #[arg(short = 'c', long)]
    pub clean: bool,

    /// The directory in which the ipa file should be stored in
    #[arg(short = 'o', long)]
    pub output_directory: Option<PathBuf>,

    /// The name of the resulting ipa file
    #[arg(short = 'n', long)]
    pub output_name: Option<String>,

    /// The SDK that should be used for building the application
    #[arg(short = 'k', long)]
    pub sdk: Option<String>,

    /// The configuration to use when building the app
    #[arg(long)]
    pub configuration: Option<String>,

    /// Hide all information that's not necessary while building
    #[arg(short = 't', long)]
    pub silent: bool,

    /// The name of the provisioning profile to use
    #[arg(short = 'l', long)]
    pub provisioning_profile_name: Option<String>,

    /// The name of the code signing identity to use
    #[arg(short = 'i', long)]
    pub codesigning_identity: Option<String>,

    /// Never prompt; several workspaces or projects are an error
    #[arg(long)]
    pub no_input: bool,
}

impl CheckArgs {
    /// Explicitly supplied values keyed by option key
    pub fn explicit_values(&self) -> BTreeMap<String, Value> {
        let mut values = BTreeMap::new();
        let path = |p: &Path| Value::String(p.to_string_lossy().to_string());

        if let Some(ref p) = self.workspace {
            values.insert("workspace".to_string(), path(p));
        }
        if let Some(ref p) = self.project {
            values.insert("project".to_string(), path(p));
        }
        if let Some(ref p) = self.provisioning_profile_path {
            values.insert("provisioning_profile_path".to_string(), path(p));
        }
        if let Some(ref p) = self.output_directory {
            values.insert("output_directory".to_string(), path(p));
        }

        let strings = [
            ("scheme", &self.scheme),
            ("output_name", &self.output_name),
            ("sdk", &self.sdk),
            ("configuration", &self.configuration),
            ("provisioning_profile_name", &self.provisioning_profile_name),
            ("codesigning_identity", &self.codesigning_identity),
        ];
        for (key, value) in strings {
            if let Some(v) = value {
                values.insert(key.to_string(), Value::String(v.clone()));
            }
        }

        // Unset switches fall through to env, file and defaults
        if self.clean {
            values.insert("clean".to_string(), Value::Bool(true));
        }
        if self.silent {
            values.insert("silent".to_string(), Value::Bool(true));
        }

        values
    }
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    config: &'a GymConfig,
    ipa_path: PathBuf,
    command: String,
    sources: BTreeMap<String, ValueSource>,
}

impl GymCommand {
    /// Execute the gym command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let subcommand_name = match &self.subcommand {
            GymSubcommand::Options { .. } => "options",
            GymSubcommand::Check(_) => "check",
        };
        info!(subcommand = subcommand_name, "executing gym command");

        let cwd = std::env::current_dir()?;
        match &self.subcommand {
            GymSubcommand::Options { no_input } => {
                let chooser = prompt::chooser(*no_input);
                let options = gym_options(Path::new("."), chooser.as_ref())?;
                print_options(&options, cli)
            }
            GymSubcommand::Check(args) => {
                let chooser = prompt::chooser(args.no_input);
                check(&cwd, args, chooser.as_ref(), cli)
            }
        }
    }
}

fn print_options(options: &OptionSet, cli: &Cli) -> anyhow::Result<()> {
    if cli.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(options)?);
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    println!("{}", output::header("Gym options"));
    println!();
    for item in options.iter() {
        for line in output::option_entry(item) {
            println!("{}", line);
        }
    }

    Ok(())
}

/// Resolve the gym options in `dir` and report the result
fn check(dir: &Path, args: &CheckArgs, chooser: &dyn Chooser, cli: &Cli) -> anyhow::Result<()> {
    let (config, _) = load_config_or_default(dir)?;
    let options = gym_options(Path::new("."), chooser)?;

    let env = ProcessEnv;
    let sources = OptionSources::new(&env)
        .with_file_values(config.gym.clone())
        .with_values(args.explicit_values());
    let resolved = options.resolve(&sources)?;
    let gym = GymConfig::from_resolved(&resolved);

    let report = CheckReport {
        config: &gym,
        ipa_path: gym.ipa_path(),
        command: gym.xcodebuild_options().command_line(),
        sources: resolved
            .iter()
            .filter_map(|(key, _)| resolved.source(key).map(|s| (key.clone(), s)))
            .collect(),
    };

    if cli.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    output::success("Gym options are valid");
    if gym.workspace.is_none() && gym.project.is_none() {
        output::info("No workspace or project given or found; xcodebuild will use the directory default");
    }
    println!();
    for (key, value) in resolved.iter() {
        let shown = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let source = report
            .sources
            .get(key)
            .map(|s| format!(" ({})", s.as_str()))
            .unwrap_or_default();
        println!("{}{}", output::key_value(key, &shown), style(source).dim());
    }
    println!();
    println!(
        "{}",
        output::key_value("ipa", &output::path_style().apply_to(report.ipa_path.display()).to_string())
    );
    println!("{}", output::key_value("command", &report.command));

    Ok(())
}
