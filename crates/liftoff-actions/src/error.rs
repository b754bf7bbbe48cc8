//! Error types for liftoff actions

use std::path::PathBuf;

use liftoff_core::ConfigError;
use thiserror::Error;

/// Result type for action operations
pub type Result<T> = std::result::Result<T, ActionError>;

/// Action errors
#[derive(Error, Debug)]
pub enum ActionError {
    /// Invalid options or configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Build tool not installed
    #[error("Required tool '{tool}' not found. {install_hint}")]
    ToolNotFound { tool: String, install_hint: String },

    /// Build tool ran but failed
    #[error("Build failed: {message}")]
    BuildFailed { message: String },

    /// Command could not be started
    #[error("Command failed: {command}: {message}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        message: String,
    },

    /// No app bundle was produced by the build
    #[error("Couldn't find app")]
    AppNotFound { searched: PathBuf },

    /// Compressing the artifact failed
    #[error("Compression failed: {0}")]
    Compression(String),

    /// Uploading to the preview service failed
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Several candidates and no way to ask
    #[error("{prompt}: several candidates found ({}); pass one explicitly", .candidates.join(", "))]
    AmbiguousSelection {
        prompt: String,
        candidates: Vec<String>,
    },

    /// The user dismissed an interactive prompt
    #[error("Selection cancelled")]
    SelectionCancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ActionError {
    /// Create a build failed error
    pub fn build_failed(message: impl Into<String>) -> Self {
        Self::BuildFailed {
            message: message.into(),
        }
    }

    /// Create a tool not found error with install hint
    pub fn tool_not_found(tool: impl Into<String>, install_hint: impl Into<String>) -> Self {
        Self::ToolNotFound {
            tool: tool.into(),
            install_hint: install_hint.into(),
        }
    }

    /// Get exit code for CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::ToolNotFound { .. } => 3,
            Self::BuildFailed { .. } => 10,
            Self::CommandFailed { exit_code, .. } => exit_code.unwrap_or(1),
            Self::AppNotFound { .. } => 13,
            Self::Compression(_) => 14,
            Self::Upload(_) => 20,
            Self::AmbiguousSelection { .. } => 2,
            Self::SelectionCancelled => 130,
            Self::Io(_) => 1,
        }
    }
}

/// Errors from the preview service upload
#[derive(Debug, Error)]
pub enum UploadError {
    /// Artifact missing or of the wrong type
    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    /// Missing or malformed client settings
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// API error from the service
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_not_found_message() {
        let err = ActionError::AppNotFound {
            searched: PathBuf::from("/tmp/liftoff_build"),
        };
        assert_eq!(err.to_string(), "Couldn't find app");
        assert_eq!(err.exit_code(), 13);
    }

    #[test]
    fn test_ambiguous_selection_lists_candidates() {
        let err = ActionError::AmbiguousSelection {
            prompt: "Select Workspace".to_string(),
            candidates: vec!["./A.xcworkspace".to_string(), "./B.xcworkspace".to_string()],
        };
        assert!(err.to_string().contains("./A.xcworkspace, ./B.xcworkspace"));
    }

    #[test]
    fn test_config_errors_map_to_config_exit_code() {
        let err: ActionError = ConfigError::MissingField("scheme".to_string()).into();
        assert_eq!(err.exit_code(), 2);
    }
}
