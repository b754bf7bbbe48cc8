//! CLI definition and command handling

pub mod commands;
pub mod output;
pub mod prompt;

use clap::{Parser, Subcommand};

use commands::{ActionsCommand, AppetizeCommand, CompletionsCommand, GymCommand, InitCommand};

/// Liftoff - build and preview iOS apps from CI
#[derive(Debug, Parser)]
#[command(name = "liftoff")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build for the simulator and upload the app to Appetize
    Appetize(AppetizeCommand),

    /// Inspect and validate the ipa packaging options
    Gym(GymCommand),

    /// List available actions and their options
    Actions(ActionsCommand),

    /// Write a starter liftoff.yaml
    Init(InitCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Appetize(ref cmd) => cmd.execute(&self),
            Commands::Gym(ref cmd) => cmd.execute(&self),
            Commands::Actions(ref cmd) => cmd.execute(&self),
            Commands::Init(ref cmd) => cmd.execute(&self),
            Commands::Completions(ref cmd) => cmd.execute(&self),
        }
    }

    /// Whether human-readable output should be printed
    pub fn shows_text(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Text
    }
}
