//! Candidate selection when detection finds several files

use std::path::PathBuf;

use crate::error::{ActionError, Result};

/// Picks one of several candidates
pub trait Chooser {
    /// Return the index of the chosen candidate
    fn choose(&self, prompt: &str, candidates: &[PathBuf]) -> Result<usize>;
}

/// Chooser for headless runs: several candidates are an error
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl Chooser for NonInteractive {
    fn choose(&self, prompt: &str, candidates: &[PathBuf]) -> Result<usize> {
        Err(ActionError::AmbiguousSelection {
            prompt: prompt.trim_end_matches([':', ' ']).to_string(),
            candidates: candidates
                .iter()
                .map(|c| c.display().to_string())
                .collect(),
        })
    }
}
