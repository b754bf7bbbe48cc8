//! Exit codes for the CLI

#![allow(dead_code)]

use liftoff_actions::{ActionError, UploadError};
use liftoff_core::ConfigError;

/// Success
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration or validation error
pub const CONFIG_ERROR: i32 = 2;

/// Required tool missing
pub const TOOL_MISSING: i32 = 3;

/// Native build failed
pub const BUILD_FAILED: i32 = 10;

/// Build produced no artifact
pub const ARTIFACT_MISSING: i32 = 13;

/// Upload or API failure
pub const UPLOAD_ERROR: i32 = 20;

/// User cancelled
pub const CANCELLED: i32 = 130;

/// Exit code for an error bubbled up to `main`
pub fn for_error(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<ActionError>() {
        return e.exit_code();
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return CONFIG_ERROR;
    }
    if let Some(e) = err.downcast_ref::<UploadError>() {
        return match e {
            UploadError::ConfigurationError(_) => CONFIG_ERROR,
            _ => UPLOAD_ERROR,
        };
    }
    if let Some(dialoguer::Error::IO(e)) = err.downcast_ref::<dialoguer::Error>() {
        if e.kind() == std::io::ErrorKind::Interrupted {
            return CANCELLED;
        }
    }
    ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_action_errors_keep_their_code() {
        let err = anyhow::Error::new(ActionError::AppNotFound {
            searched: PathBuf::from("/tmp/liftoff_build"),
        });
        assert_eq!(for_error(&err), ARTIFACT_MISSING);

        let err = anyhow::Error::new(ActionError::build_failed("exit 65"));
        assert_eq!(for_error(&err), BUILD_FAILED);

        let err = anyhow::Error::new(ActionError::tool_not_found("xcodebuild", "Install Xcode"));
        assert_eq!(for_error(&err), TOOL_MISSING);

        let err = anyhow::Error::new(ActionError::SelectionCancelled);
        assert_eq!(for_error(&err), CANCELLED);
    }

    #[test]
    fn test_config_and_upload_errors() {
        let err = anyhow::Error::new(ConfigError::MissingField("APPETIZE_API_TOKEN".into()));
        assert_eq!(for_error(&err), CONFIG_ERROR);

        let err = anyhow::Error::new(UploadError::ApiError {
            status: 401,
            message: "bad token".into(),
        });
        assert_eq!(for_error(&err), UPLOAD_ERROR);

        let err = anyhow::Error::new(UploadError::ConfigurationError(
            "APPETIZE_API_TOKEN not set".into(),
        ));
        assert_eq!(for_error(&err), CONFIG_ERROR);
    }

    #[test]
    fn test_context_preserves_code() {
        let err = anyhow::Error::new(ActionError::build_failed("exit 65"))
            .context("building MyApp");
        assert_eq!(for_error(&err), BUILD_FAILED);
    }

    #[test]
    fn test_other_errors_are_general() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(for_error(&err), ERROR);
        assert_eq!(SUCCESS, 0);
    }
}
