//! Interactive candidate selection

use std::path::PathBuf;

use console::Term;
use dialoguer::Select;
use tracing::debug;

use liftoff_actions::{ActionError, Chooser, NonInteractive};

/// Asks the user with a `dialoguer` select list
#[derive(Debug, Clone, Copy, Default)]
pub struct DialoguerChooser;

impl Chooser for DialoguerChooser {
    fn choose(&self, prompt: &str, candidates: &[PathBuf]) -> liftoff_actions::Result<usize> {
        let items: Vec<String> = candidates
            .iter()
            .map(|c| c.display().to_string())
            .collect();

        let selection = Select::new()
            .with_prompt(prompt.trim_end_matches([':', ' ']))
            .items(&items)
            .default(0)
            .interact_opt()
            .map_err(|e| ActionError::Io(std::io::Error::other(e.to_string())))?;

        match selection {
            Some(index) => {
                debug!(choice = %items[index], "candidate selected");
                Ok(index)
            }
            None => Err(ActionError::SelectionCancelled),
        }
    }
}

/// Whether prompts may be shown
pub fn interactive_allowed(no_input: bool, ci: Option<&str>, is_term: bool) -> bool {
    let in_ci = ci.map(|v| !v.is_empty() && v != "false" && v != "0").unwrap_or(false);
    !no_input && !in_ci && is_term
}

/// The chooser to use for this process
pub fn chooser(no_input: bool) -> Box<dyn Chooser> {
    let ci = std::env::var("CI").ok();
    if interactive_allowed(no_input, ci.as_deref(), Term::stderr().is_term()) {
        Box::new(DialoguerChooser)
    } else {
        Box::new(NonInteractive)
    }
}
