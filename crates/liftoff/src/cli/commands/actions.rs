//! Actions command - list available actions

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::info;

use liftoff_actions::{all_actions, Action, Platform};
use liftoff_core::OptionSet;

use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// List available actions
#[derive(Debug, Args)]
pub struct ActionsCommand {
    /// Include each action's option table
    #[arg(short, long)]
    pub options: bool,
}

#[derive(Debug, Serialize)]
struct ActionSummary {
    id: &'static str,
    description: &'static str,
    details: Option<&'static str>,
    authors: &'static [&'static str],
    return_value: Option<&'static str>,
    platforms: Vec<Platform>,
    options: OptionSet,
}

fn summarize(action: &dyn Action) -> anyhow::Result<ActionSummary> {
    Ok(ActionSummary {
        id: action.id(),
        description: action.description(),
        details: action.details(),
        authors: action.authors(),
        return_value: action.return_value(),
        platforms: action.platforms(),
        options: action.available_options()?,
    })
}

impl ActionsCommand {
    /// Execute the actions command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(options = self.options, "executing actions command");

        let summaries = all_actions()
            .iter()
            .map(|a| summarize(a.as_ref()))
            .collect::<anyhow::Result<Vec<_>>>()?;

        if cli.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
            return Ok(());
        }
        if cli.quiet {
            return Ok(());
        }

        for summary in &summaries {
            let platforms: Vec<&str> = summary.platforms.iter().map(|p| p.as_str()).collect();
            println!(
                "{} {}",
                output::header(summary.id),
                style(format!("[{}]", platforms.join(", "))).dim()
            );
            println!("  {}", summary.description);
            if let Some(details) = summary.details {
                println!("  {}", style(details).dim());
            }

            if self.options || cli.verbose {
                for item in summary.options.iter() {
                    let flag = item.short_option.as_deref().unwrap_or("  ");
                    println!(
                        "    {} {:<28} {}",
                        output::flag_style().apply_to(flag),
                        item.key,
                        style(&item.description).dim()
                    );
                }
            } else {
                println!(
                    "{}",
                    output::key_value("options", &summary.options.keys())
                );
            }
            println!();
        }

        Ok(())
    }
}
