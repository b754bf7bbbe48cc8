//! Init command - write a starter liftoff.yaml

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use console::style;
use dialoguer::{Confirm, Select};
use tracing::{debug, info};

use liftoff_core::config::{
    validate_config, Config, DEFAULT_CONFIG_TEMPLATE, DEFAULT_CONFIG_TOML, DEFAULT_CONFIG_YAML,
};

use crate::cli::{output, Cli};

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    fn file_name(self) -> &'static str {
        match self {
            Self::Yaml => DEFAULT_CONFIG_YAML,
            Self::Toml => DEFAULT_CONFIG_TOML,
        }
    }

    /// Starter configuration in this format
    pub fn render(self) -> anyhow::Result<String> {
        match self {
            Self::Yaml => Ok(DEFAULT_CONFIG_TEMPLATE.to_string()),
            Self::Toml => {
                let config: Config = serde_yaml::from_str(DEFAULT_CONFIG_TEMPLATE)?;
                validate_config(&config)?;
                Ok(toml::to_string_pretty(&config)?)
            }
        }
    }
}

/// Write a starter configuration file
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,

    /// Accept defaults without prompting
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// File format (asked interactively when omitted)
    #[arg(long, value_enum)]
    pub config_format: Option<ConfigFormat>,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl InitCommand {
    /// Execute the init command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(force = self.force, yes = self.yes, "executing init command");

        let format = match self.config_format {
            Some(format) => format,
            None if self.yes => ConfigFormat::Yaml,
            None => {
                let choices = [ConfigFormat::Yaml, ConfigFormat::Toml];
                let index = Select::new()
                    .with_prompt("Configuration format")
                    .items(&["yaml", "toml"])
                    .default(0)
                    .interact()?;
                choices[index]
            }
        };

        let path = self.target_path(&std::env::current_dir()?, format);
        debug!(path = %path.display(), ?format, "config target");

        if path.exists() && !self.force {
            if self.yes {
                anyhow::bail!(
                    "{} already exists. Use --force to overwrite.",
                    path.display()
                );
            }
            let overwrite = Confirm::new()
                .with_prompt(format!("{} already exists. Overwrite?", path.display()))
                .default(false)
                .interact()?;
            if !overwrite {
                output::warning("Aborted.");
                return Ok(());
            }
        }

        std::fs::write(&path, format.render()?)?;

        if !cli.quiet {
            output::success(&format!(
                "Created configuration at {}",
                output::path_style().apply_to(path.display())
            ));
            println!();
            println!("Next steps:");
            println!("  1. Export {} for uploads", style("APPETIZE_API_TOKEN").cyan());
            println!("  2. Run {} to verify the packaging options", style("liftoff gym check").cyan());
            println!("  3. Run {} to publish a preview", style("liftoff appetize").cyan());
        }

        Ok(())
    }

    /// `--output` as given, or the default file name for `format` in `dir`
    fn target_path(&self, dir: &Path, format: ConfigFormat) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| dir.join(format.file_name()))
    }
}
