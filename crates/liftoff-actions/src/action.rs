//! Action metadata

use std::fmt;

use liftoff_core::OptionSet;
use serde::Serialize;

/// Platforms an action can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Mac,
}

impl Platform {
    pub fn all() -> &'static [Platform] {
        &[Platform::Ios, Platform::Android, Platform::Mac]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Mac => "mac",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A build/upload procedure and its declared options
pub trait Action {
    /// Stable identifier (e.g. `build_and_upload_to_appetize`)
    fn id(&self) -> &'static str;

    /// One line description
    fn description(&self) -> &'static str;

    /// Longer explanation
    fn details(&self) -> Option<&'static str> {
        None
    }

    fn authors(&self) -> &'static [&'static str];

    /// Description of what a run returns
    fn return_value(&self) -> Option<&'static str> {
        None
    }

    fn is_supported(&self, platform: Platform) -> bool;

    /// Option table consumed by the resolution engine
    fn available_options(&self) -> liftoff_core::Result<OptionSet>;

    /// Platforms this action supports
    fn platforms(&self) -> Vec<Platform> {
        Platform::all()
            .iter()
            .copied()
            .filter(|p| self.is_supported(*p))
            .collect()
    }
}
