//! Liftoff actions
//!
//! Each action declares its options through [`liftoff_core::OptionSet`] and
//! runs against injectable collaborators, so the external tools (xcodebuild,
//! the Appetize API, an interactive prompt) can be swapped out in tests.
//!
//! ## Actions
//!
//! - **build_and_upload_to_appetize**: build for the iOS simulator, zip the
//!   newest `.app`, upload it to Appetize and write `appetize_public_key.txt`
//! - **gym**: option table for building and packaging an `.ipa`, with
//!   workspace/project auto-detection
//!
//! ## Usage
//!
//! ```ignore
//! use liftoff_actions::{AppetizeClient, BuildAndUploadRunner, Xcodebuild, ZipCompressor};
//!
//! let uploader = AppetizeClient::new(config);
//! let runner = BuildAndUploadRunner::new(&Xcodebuild::new(), &ZipCompressor, &uploader);
//! let output = runner.run(&params).await?;
//! println!("{}", output.upload.public_key);
//! ```

pub mod action;
pub mod appetize;
pub mod archive;
pub mod build_and_upload;
pub mod chooser;
pub mod error;
pub mod gym;
pub mod scratch;
pub mod xcodebuild;

pub use action::{Action, Platform};
pub use appetize::{AppetizeClient, AppetizeConfig, AppetizeUpload, PreviewUploader};
pub use archive::{Compressor, ZipCompressor};
pub use build_and_upload::{
    ActionOutput, BuildAndUploadParams, BuildAndUploadRunner, BuildAndUploadToAppetize,
};
pub use chooser::{Chooser, NonInteractive};
pub use error::{ActionError, Result, UploadError};
pub use gym::{gym_options, Gym, GymConfig};
pub use scratch::ScratchDir;
pub use xcodebuild::{BuildTool, Xcodebuild, XcodebuildOptions};

/// Every registered action, in display order
pub fn all_actions() -> Vec<Box<dyn Action>> {
    vec![Box::new(BuildAndUploadToAppetize), Box::new(Gym::default())]
}
