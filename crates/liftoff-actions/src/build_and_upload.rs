//! Build a simulator app and upload it to Appetize
//!
//! The pipeline is strictly linear: build, locate the `.app`, zip it, upload
//! the zip, write the returned public key. Any failure aborts the run. Each
//! run builds in its own [`ScratchDir`] under the scratch location, removed
//! on every exit path.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use liftoff_core::{OptionDescriptor, OptionSet, ResolvedOptions, ValueKind};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::action::{Action, Platform};
use crate::appetize::{AppetizeUpload, PreviewUploader};
use crate::archive::{sha256_file, Compressor};
use crate::error::{ActionError, Result};
use crate::scratch::{default_scratch_dir, ScratchDir};
use crate::xcodebuild::{BuildTool, XcodebuildOptions};

/// SDK forced for preview builds
pub const SIMULATOR_SDK: &str = "iphonesimulator";

/// Archive name inside the scratch directory
pub const RESULT_ARCHIVE: &str = "Result.zip";

/// File the public key is written to
pub const PUBLIC_KEY_FILE: &str = "appetize_public_key.txt";

/// Action metadata and option table
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildAndUploadToAppetize;

impl Action for BuildAndUploadToAppetize {
    fn id(&self) -> &'static str {
        "build_and_upload_to_appetize"
    }

    fn description(&self) -> &'static str {
        "Generate and upload an ipa file to appetize.io"
    }

    fn details(&self) -> Option<&'static str> {
        Some("This should be called from danger")
    }

    fn authors(&self) -> &'static [&'static str] {
        &["liftoff contributors"]
    }

    fn return_value(&self) -> Option<&'static str> {
        Some("The Appetize public key, also written to appetize_public_key.txt")
    }

    fn is_supported(&self, platform: Platform) -> bool {
        platform == Platform::Ios
    }

    fn available_options(&self) -> liftoff_core::Result<OptionSet> {
        OptionSet::new(vec![
            OptionDescriptor::new(
                "xcodebuild",
                "Parameters that are passed to the xcodebuild action",
            )
            .short("-x")
            .kind(ValueKind::Map)
            .default_value(json!({}))
            .optional(),
            OptionDescriptor::new(
                "scheme",
                "The scheme to build. Can also be passed using the `xcodebuild` parameter",
            )
            .short("-s")
            .optional(),
        ])
    }
}

/// Inputs of one build-and-upload run
#[derive(Debug, Clone, Default)]
pub struct BuildAndUploadParams {
    pub xcodebuild: XcodebuildOptions,
    pub scheme: Option<String>,
}

impl BuildAndUploadParams {
    pub fn from_resolved(options: &ResolvedOptions) -> Self {
        Self {
            xcodebuild: options
                .map("xcodebuild")
                .map(XcodebuildOptions::from)
                .unwrap_or_default(),
            scheme: options.string("scheme").map(String::from),
        }
    }
}

/// Result of a successful run.
///
/// `app_path` and `archive_path` point into the scratch directory, which is
/// gone once the run returns.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutput {
    pub app_path: PathBuf,
    pub archive_path: PathBuf,
    pub archive_sha256: String,
    pub upload: AppetizeUpload,
    pub key_file: PathBuf,
}

/// Runs the pipeline against injected collaborators
pub struct BuildAndUploadRunner<'a> {
    builder: &'a dyn BuildTool,
    compressor: &'a dyn Compressor,
    uploader: &'a dyn PreviewUploader,
    scratch_dir: PathBuf,
    output_dir: PathBuf,
}

impl<'a> BuildAndUploadRunner<'a> {
    pub fn new(
        builder: &'a dyn BuildTool,
        compressor: &'a dyn Compressor,
        uploader: &'a dyn PreviewUploader,
    ) -> Self {
        Self {
            builder,
            compressor,
            uploader,
            scratch_dir: default_scratch_dir(),
            output_dir: PathBuf::from("."),
        }
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Effective xcodebuild parameters with derived data under the scratch
    /// location. Each run builds into its own directory below it.
    pub fn prepare_options(&self, params: &BuildAndUploadParams) -> XcodebuildOptions {
        build_options(params, &self.scratch_dir)
    }

    /// Build, compress, upload and persist the public key
    #[instrument(skip_all, fields(scratch = %self.scratch_dir.display()))]
    pub async fn run(&self, params: &BuildAndUploadParams) -> Result<ActionOutput> {
        let scratch = ScratchDir::create(&self.scratch_dir)?;
        let options = build_options(params, scratch.path());

        info!(scheme = ?options.get_str("scheme"), "building for the simulator");
        self.builder.build(&options).await?;

        let app_path = find_newest_app(scratch.path())?.ok_or_else(|| ActionError::AppNotFound {
            searched: scratch.path().to_path_buf(),
        })?;
        info!(app = %app_path.display(), "found app bundle");

        let archive_path = self
            .compressor
            .compress(&app_path, &scratch.join(RESULT_ARCHIVE))
            .await?;
        let archive_sha256 = sha256_file(&archive_path)?;
        debug!(archive = %archive_path.display(), sha256 = %archive_sha256, "compressed app");

        let upload = self.uploader.upload(&archive_path).await?;

        let key_file = self.output_dir.join(PUBLIC_KEY_FILE);
        tokio::fs::write(&key_file, &upload.public_key).await?;
        info!(public_key = %upload.public_key, file = %key_file.display(), "Generated Public Key");

        Ok(ActionOutput {
            app_path,
            archive_path,
            archive_sha256,
            upload,
            key_file,
        })
    }
}

/// xcodebuild parameters for one run.
///
/// The SDK and derived data path always overwrite caller values; the
/// top-level scheme only fills in a missing one.
fn build_options(params: &BuildAndUploadParams, derived_data: &Path) -> XcodebuildOptions {
    let mut options = params.xcodebuild.clone();
    options.set("sdk", SIMULATOR_SDK);
    options.set("derivedDataPath", derived_data.to_string_lossy().to_string());

    if let Some(scheme) = params.scheme.as_deref().filter(|s| !s.is_empty()) {
        options.set_if_absent("scheme", scheme);
    }

    options
}

/// Newest `*.app` under `root`.
///
/// Newest means latest modification time; ties go to the lexicographically
/// last path. Bundles nested inside another `.app` (watch apps) are skipped.
pub fn find_newest_app(root: &Path) -> Result<Option<PathBuf>> {
    let pattern = format!("{}/**/*.app", glob::Pattern::escape(&root.to_string_lossy()));
    let entries = glob::glob(&pattern).map_err(|e| {
        ActionError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            e.to_string(),
        ))
    })?;

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                debug!(error = %e, "skipping unreadable path");
                continue;
            }
        };

        let nested = path
            .strip_prefix(root)
            .map(|rel| {
                rel.ancestors()
                    .skip(1)
                    .any(|a| a.extension().map(|e| e == "app").unwrap_or(false))
            })
            .unwrap_or(false);
        if nested {
            continue;
        }

        let modified = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let candidate = (modified, path);
        if newest.as_ref().map(|current| candidate > *current).unwrap_or(true) {
            newest = Some(candidate);
        }
    }

    Ok(newest.map(|(_, path)| path))
}
