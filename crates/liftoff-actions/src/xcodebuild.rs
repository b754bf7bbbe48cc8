//! xcodebuild invocation
//!
//! [`XcodebuildOptions`] is the nested key/value parameter map actions pass to
//! the build tool. Keys use xcodebuild's own spelling (`derivedDataPath`);
//! snake_case aliases (`derived_data_path`) are folded into the same key on
//! insert so a value can never be passed twice.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{ActionError, Result};

/// Build actions rendered as positional arguments, in this order
const BUILD_ACTIONS: [&str; 6] = ["clean", "build", "archive", "analyze", "test", "install"];

/// Known flags, rendered first and in this order
const KNOWN_FLAGS: [&str; 11] = [
    "workspace",
    "project",
    "scheme",
    "target",
    "configuration",
    "sdk",
    "destination",
    "xcconfig",
    "derivedDataPath",
    "archivePath",
    "resultBundlePath",
];

/// Key holding `KEY=value` build setting overrides
pub const BUILD_SETTINGS_KEY: &str = "build_settings";

fn canonical_key(key: &str) -> &str {
    match key {
        "derived_data_path" => "derivedDataPath",
        "archive_path" => "archivePath",
        "result_bundle_path" => "resultBundlePath",
        other => other,
    }
}

/// Parameters passed to xcodebuild
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Value>", into = "BTreeMap<String, Value>")]
pub struct XcodebuildOptions {
    values: BTreeMap<String, Value>,
}

impl From<BTreeMap<String, Value>> for XcodebuildOptions {
    fn from(map: BTreeMap<String, Value>) -> Self {
        let mut options = Self::default();
        for (key, value) in map {
            options.set(key, value);
        }
        options
    }
}

impl From<XcodebuildOptions> for BTreeMap<String, Value> {
    fn from(options: XcodebuildOptions) -> Self {
        options.values
    }
}

impl From<&Map<String, Value>> for XcodebuildOptions {
    fn from(map: &Map<String, Value>) -> Self {
        let mut options = Self::default();
        for (key, value) in map {
            options.set(key.clone(), value.clone());
        }
        options
    }
}

impl XcodebuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(canonical_key(key))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).map(|v| !v.is_null()).unwrap_or(false)
    }

    /// Set a value, overwriting any existing one
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let key = canonical_key(&key).to_string();
        self.values.insert(key, value.into());
    }

    /// Set a value only when the key is not already present
    pub fn set_if_absent(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        if self.contains(&key) {
            return false;
        }
        self.set(key, value);
        true
    }

    /// Add a `KEY=value` build setting override
    pub fn set_build_setting(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let entry = self
            .values
            .entry(BUILD_SETTINGS_KEY.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(settings) = entry {
            settings.insert(key.into(), Value::String(value.into()));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Render the xcodebuild argument list
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        for flag in KNOWN_FLAGS {
            if let Some(value) = self.values.get(flag) {
                push_flag(&mut args, flag, value);
            }
        }

        for (key, value) in &self.values {
            let key = key.as_str();
            if KNOWN_FLAGS.contains(&key) || BUILD_ACTIONS.contains(&key) || key == BUILD_SETTINGS_KEY
            {
                continue;
            }
            push_flag(&mut args, key, value);
        }

        let mut actions: Vec<&str> = BUILD_ACTIONS
            .iter()
            .copied()
            .filter(|action| self.values.get(*action).map(is_truthy).unwrap_or(false))
            .collect();
        if actions.is_empty() {
            actions.push("build");
        }
        args.extend(actions.into_iter().map(String::from));

        if let Some(Value::Object(settings)) = self.values.get(BUILD_SETTINGS_KEY) {
            for (key, value) in settings {
                args.push(format!("{}={}", key, scalar(value)));
            }
        }

        args
    }

    /// Full command line for display
    pub fn command_line(&self) -> String {
        let mut parts = vec!["xcodebuild".to_string()];
        parts.extend(self.to_args().into_iter().map(|arg| {
            if arg.contains(' ') {
                format!("\"{}\"", arg)
            } else {
                arg
            }
        }));
        parts.join(" ")
    }
}

fn push_flag(args: &mut Vec<String>, key: &str, value: &Value) {
    match value {
        Value::Null | Value::Bool(false) => {}
        Value::Bool(true) => args.push(format!("-{}", key)),
        other => {
            args.push(format!("-{}", key));
            args.push(scalar(other));
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes"),
        _ => false,
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Native build tool
#[async_trait]
pub trait BuildTool: Send + Sync {
    /// Run a build with the given parameters
    async fn build(&self, options: &XcodebuildOptions) -> Result<()>;
}

/// Runs the `xcodebuild` binary
#[derive(Debug, Clone)]
pub struct Xcodebuild {
    program: String,
    working_dir: Option<PathBuf>,
}

impl Xcodebuild {
    pub fn new() -> Self {
        Self {
            program: "xcodebuild".to_string(),
            working_dir: None,
        }
    }

    /// Use another executable (a wrapper script, for example)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl Default for Xcodebuild {
    fn default() -> Self {
        Self::new()
    }
}

/// Last `lines` lines of tool output
fn tail(output: &[u8], lines: usize) -> String {
    let text = String::from_utf8_lossy(output);
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[async_trait]
impl BuildTool for Xcodebuild {
    async fn build(&self, options: &XcodebuildOptions) -> Result<()> {
        let program = which::which(&self.program).map_err(|_| {
            ActionError::tool_not_found(&self.program, "Install Xcode from the App Store")
        })?;

        let args = options.to_args();
        info!(command = %options.command_line(), "running xcodebuild");

        let mut cmd = tokio::process::Command::new(&program);
        cmd.args(&args);
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|e| ActionError::CommandFailed {
            command: options.command_line(),
            exit_code: None,
            message: e.to_string(),
        })?;

        debug!(status = ?output.status, "xcodebuild finished");

        if !output.status.success() {
            // xcodebuild reports compile errors on stdout
            let mut message = format!("{} exited with {}", self.program, output.status);
            let stderr = tail(&output.stderr, 20);
            let stdout = tail(&output.stdout, 20);
            for part in [stderr, stdout] {
                if !part.trim().is_empty() {
                    message.push('\n');
                    message.push_str(&part);
                }
            }
            return Err(ActionError::build_failed(message));
        }

        Ok(())
    }
}
