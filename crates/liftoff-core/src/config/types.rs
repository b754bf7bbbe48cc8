//! Configuration types

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Main configuration for liftoff
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Appetize upload settings
    pub appetize: AppetizeSection,

    /// Build-and-upload action settings
    pub build_and_upload: BuildAndUploadSection,

    /// Raw values for the gym option table, keyed by option key
    pub gym: BTreeMap<String, Value>,
}

/// Appetize upload settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppetizeSection {
    /// API host (defaults to the public Appetize API)
    pub api_host: Option<String>,

    /// Public key of an existing app to update instead of creating a new one
    pub public_key: Option<String>,

    /// Note attached to the uploaded build
    pub note: Option<String>,

    /// Target platform (`ios` or `android`)
    pub platform: Option<String>,

    /// Only present so validation can reject tokens stored in files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

/// Build-and-upload action settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildAndUploadSection {
    /// Scheme used when `xcodebuild` does not name one
    pub scheme: Option<String>,

    /// Location for per-run derived data directories
    pub scratch_dir: Option<PathBuf>,

    /// Where the public key file is written
    pub output_dir: Option<PathBuf>,

    /// Parameters passed to xcodebuild
    pub xcodebuild: BTreeMap<String, Value>,
}
