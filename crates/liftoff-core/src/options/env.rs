//! Environment variable lookup

use std::collections::{BTreeMap, HashMap};

/// Source of environment variables for option resolution
pub trait EnvSource {
    /// Look up a variable, returning `None` when it is unset
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the environment of the current process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}
