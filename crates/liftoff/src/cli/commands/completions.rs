//! Completions command

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use tracing::info;

use crate::cli::{output, Cli};

/// Print a completion script for a shell
#[derive(Debug, Args)]
pub struct CompletionsCommand {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Completion script for `shell`
pub fn render(shell: Shell) -> Vec<u8> {
    let mut script = Vec::new();
    generate(shell, &mut Cli::command(), "liftoff", &mut script);
    script
}

impl CompletionsCommand {
    /// Execute the completions command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(shell = %self.shell, "executing completions command");
        let script = render(self.shell);

        let Some(ref path) = self.output else {
            std::io::stdout().write_all(&script)?;
            return Ok(());
        };

        std::fs::write(path, &script)?;
        if !cli.quiet {
            output::success(&format!(
                "{} completions written to {}",
                self.shell,
                output::path_style().apply_to(path.display())
            ));
        }
        Ok(())
    }
}
