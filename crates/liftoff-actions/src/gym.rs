//! Packaging options for building an installable `.ipa`
//!
//! [`Gym::detect`] looks for a workspace or project in a directory and turns
//! the result into defaults for the option table returned by
//! [`Gym::plain_options`]. A workspace wins: projects are only considered
//! when no workspace default exists. When several candidates exist the
//! injected [`Chooser`] decides.

use std::path::{Path, PathBuf};

use liftoff_core::{OptionDescriptor, OptionSet, ResolvedOptions, Validator, ValueKind};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::action::{Action, Platform};
use crate::chooser::Chooser;
use crate::error::Result;
use crate::xcodebuild::XcodebuildOptions;

pub const WORKSPACE_EXTENSION: &str = "xcworkspace";
pub const PROJECT_EXTENSION: &str = "xcodeproj";
pub const PACKAGE_EXTENSION: &str = ".ipa";

/// Entries in `dir` named `*.<extension>`, sorted, joined onto `dir`
pub fn find_bundles(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let suffix = format!(".{}", extension);
    let mut found = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || !name.ends_with(&suffix) {
            continue;
        }
        found.push(dir.join(&*name));
    }

    found.sort();
    debug!(dir = %dir.display(), extension, count = found.len(), "scanned for bundles");
    Ok(found)
}

fn pick(candidates: Vec<PathBuf>, prompt: &str, chooser: &dyn Chooser) -> Result<Option<PathBuf>> {
    match candidates.len() {
        0 => Ok(None),
        1 => Ok(candidates.into_iter().next()),
        _ => {
            let index = chooser.choose(prompt, &candidates)?;
            Ok(candidates.into_iter().nth(index))
        }
    }
}

/// The packaging tool and its detected defaults
#[derive(Debug, Clone, Default)]
pub struct Gym {
    pub workspace: Option<PathBuf>,
    pub project: Option<PathBuf>,
}

impl Gym {
    /// Detect the workspace or project to default to
    pub fn detect(dir: &Path, chooser: &dyn Chooser) -> Result<Self> {
        let workspace = pick(
            find_bundles(dir, WORKSPACE_EXTENSION)?,
            "Select Workspace: ",
            chooser,
        )?;

        let project = if workspace.is_none() {
            pick(
                find_bundles(dir, PROJECT_EXTENSION)?,
                "Select Project: ",
                chooser,
            )?
        } else {
            None
        };

        info!(workspace = ?workspace, project = ?project, "detected Xcode project");
        Ok(Self { workspace, project })
    }

    /// The option table, with the given workspace/project defaults
    pub fn plain_options(
        project: Option<&Path>,
        workspace: Option<&Path>,
    ) -> liftoff_core::Result<OptionSet> {
        let path_value = |p: Option<&Path>| {
            p.map(|p| Value::String(p.to_string_lossy().to_string()))
                .unwrap_or(Value::Null)
        };

        OptionSet::new(vec![
            OptionDescriptor::new("workspace", "Path the workspace file")
                .short("-w")
                .env("GYM_WORKSPACE")
                .optional()
                .default_value(path_value(workspace))
                .validator(Validator::bundle("Workspace", ".xcworkspace", "workspace")),
            OptionDescriptor::new("project", "Path the project file")
                .short("-p")
                .env("GYM_PROJECT")
                .optional()
                .default_value(path_value(project))
                .validator(Validator::bundle("Project", ".xcodeproj", "project file")),
            OptionDescriptor::new(
                "provisioning_profile_path",
                "The path to the provisioning profile",
            )
            .short("-h")
            .env("GYM_PROVISIONING_PROFILE_PATH")
            .optional()
            .validator(Validator::path_exists("Provisioning profile")),
            OptionDescriptor::new(
                "scheme",
                "The project's scheme. Make sure it's marked as `Shared`",
            )
            .short("-s")
            .env("GYM_SCHEME")
            .optional(),
            OptionDescriptor::new("clean", "Should the project be cleaned before building it?")
                .short("-c")
                .env("GYM_CLEAN")
                .kind(ValueKind::Bool)
                .default_value(false),
            OptionDescriptor::new(
                "output_directory",
                "The directory in which the ipa file should be stored in",
            )
            .short("-o")
            .env("GYM_OUTPUT_DIRECTORY")
            .default_value(".")
            .validator(Validator::directory("Directory")),
            OptionDescriptor::new("output_name", "The name of the resulting ipa file")
                .short("-n")
                .env("GYM_OUTPUT_NAME")
                .optional()
                .validator(Validator::strip_suffix(PACKAGE_EXTENSION)),
            OptionDescriptor::new(
                "sdk",
                "The SDK that should be used for building the application",
            )
            .short("-k")
            .env("GYM_SDK")
            .optional(),
            OptionDescriptor::new(
                "configuration",
                "The configuration to use when building the app. Defaults to 'Release'",
            )
            .short("-q")
            .env("GYM_CONFIGURATION")
            .default_value("Release"),
            OptionDescriptor::new(
                "silent",
                "Hide all information that's not necessary while building",
            )
            .short("-t")
            .env("GYM_SILENT")
            .kind(ValueKind::Bool)
            .default_value(false),
            OptionDescriptor::new(
                "provisioning_profile_name",
                "The name of the provisioning profile to use. It has to match the name exactly",
            )
            .short("-l")
            .env("GYM_PROVISIONING_PROFILE_NAME")
            .optional(),
            OptionDescriptor::new(
                "codesigning_identity",
                "The name of the code signing identity to use. It has to match the name exactly. \
                 You usually don't need this! e.g. 'iPhone Distribution: SunApps GmbH'",
            )
            .short("-i")
            .env("GYM_CODE_SIGNING_IDENTITY")
            .optional(),
        ])
    }
}

/// Detect defaults in `dir` and build the option table.
///
/// The returned set is owned by the caller; nothing is cached between calls.
pub fn gym_options(dir: &Path, chooser: &dyn Chooser) -> Result<OptionSet> {
    let gym = Gym::detect(dir, chooser)?;
    Ok(gym.available_options()?)
}

impl Action for Gym {
    fn id(&self) -> &'static str {
        "gym"
    }

    fn description(&self) -> &'static str {
        "Build and package an iOS app into an installable ipa"
    }

    fn details(&self) -> Option<&'static str> {
        Some("Declares and validates the packaging options; the workspace or project is detected from the working directory")
    }

    fn authors(&self) -> &'static [&'static str] {
        &["liftoff contributors"]
    }

    fn is_supported(&self, platform: Platform) -> bool {
        platform == Platform::Ios
    }

    fn available_options(&self) -> liftoff_core::Result<OptionSet> {
        Self::plain_options(self.project.as_deref(), self.workspace.as_deref())
    }
}

/// Resolved packaging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GymConfig {
    pub workspace: Option<PathBuf>,
    pub project: Option<PathBuf>,
    pub scheme: Option<String>,
    pub sdk: Option<String>,
    pub output_directory: PathBuf,
    pub output_name: Option<String>,
    pub configuration: String,
    pub provisioning_profile_path: Option<PathBuf>,
    pub provisioning_profile_name: Option<String>,
    pub codesigning_identity: Option<String>,
    pub clean: bool,
    pub silent: bool,
}

impl GymConfig {
    pub fn from_resolved(options: &ResolvedOptions) -> Self {
        Self {
            workspace: options.path("workspace"),
            project: options.path("project"),
            scheme: options.string("scheme").map(String::from),
            sdk: options.string("sdk").map(String::from),
            output_directory: options.path("output_directory").unwrap_or_else(|| PathBuf::from(".")),
            output_name: options.string("output_name").map(String::from),
            configuration: options
                .string("configuration")
                .unwrap_or("Release")
                .to_string(),
            provisioning_profile_path: options.path("provisioning_profile_path"),
            provisioning_profile_name: options.string("provisioning_profile_name").map(String::from),
            codesigning_identity: options.string("codesigning_identity").map(String::from),
            clean: options.bool("clean"),
            silent: options.bool("silent"),
        }
    }

    /// Base name of the produced ipa and archive
    pub fn package_name(&self) -> String {
        self.output_name
            .clone()
            .or_else(|| self.scheme.clone())
            .unwrap_or_else(|| "App".to_string())
    }

    /// Path of the resulting ipa
    pub fn ipa_path(&self) -> PathBuf {
        self.output_directory
            .join(format!("{}{}", self.package_name(), PACKAGE_EXTENSION))
    }

    /// xcodebuild parameters for archiving with this configuration
    pub fn xcodebuild_options(&self) -> XcodebuildOptions {
        let mut options = XcodebuildOptions::new();

        if let Some(ref workspace) = self.workspace {
            options.set("workspace", workspace.to_string_lossy().to_string());
        } else if let Some(ref project) = self.project {
            options.set("project", project.to_string_lossy().to_string());
        }
        if let Some(ref scheme) = self.scheme {
            options.set("scheme", scheme.clone());
        }
        if let Some(ref sdk) = self.sdk {
            options.set("sdk", sdk.clone());
        }
        options.set("configuration", self.configuration.clone());
        options.set(
            "archivePath",
            self.output_directory
                .join(format!("{}.xcarchive", self.package_name()))
                .to_string_lossy()
                .to_string(),
        );
        if self.silent {
            options.set("quiet", true);
        }
        if self.clean {
            options.set("clean", true);
        }
        options.set("archive", true);

        if let Some(ref name) = self.provisioning_profile_name {
            options.set_build_setting("PROVISIONING_PROFILE_SPECIFIER", name.clone());
        }
        if let Some(ref identity) = self.codesigning_identity {
            options.set_build_setting("CODE_SIGN_IDENTITY", identity.clone());
        }

        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chooser::NonInteractive;
    use crate::error::ActionError;
    use liftoff_core::{ConfigError, OptionSources};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Picks a fixed index and records the prompts it was shown
    struct FixedChooser {
        index: usize,
        prompts: RefCell<Vec<String>>,
    }

    impl FixedChooser {
        fn new(index: usize) -> Self {
            Self {
                index,
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl Chooser for FixedChooser {
        fn choose(&self, prompt: &str, _candidates: &[PathBuf]) -> Result<usize> {
            self.prompts.borrow_mut().push(prompt.to_string());
            Ok(self.index)
        }
    }

    fn default_of(set: &OptionSet, key: &str) -> Option<String> {
        set.get(key)
            .and_then(|d| d.default_value.as_ref())
            .and_then(|v| v.as_str())
            .map(String::from)
    }

    #[test]
    fn test_single_workspace_is_default() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("MyApp.xcworkspace")).unwrap();

        let gym = Gym::detect(temp.path(), &NonInteractive).unwrap();
        let options = gym.available_options().unwrap();

        let expected = temp.path().join("MyApp.xcworkspace");
        assert_eq!(
            default_of(&options, "workspace"),
            Some(expected.to_string_lossy().to_string())
        );
        assert_eq!(default_of(&options, "project"), None);
    }

    #[test]
    fn test_single_project_is_default() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("MyApp.xcodeproj")).unwrap();

        let gym = Gym::detect(temp.path(), &NonInteractive).unwrap();
        let options = gym.available_options().unwrap();

        let expected = temp.path().join("MyApp.xcodeproj");
        assert_eq!(
            default_of(&options, "project"),
            Some(expected.to_string_lossy().to_string())
        );
        assert_eq!(default_of(&options, "workspace"), None);
    }

    #[test]
    fn test_workspace_suppresses_project_detection() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("MyApp.xcworkspace")).unwrap();
        std::fs::create_dir(temp.path().join("A.xcodeproj")).unwrap();
        std::fs::create_dir(temp.path().join("B.xcodeproj")).unwrap();

        // NonInteractive would fail if projects were considered
        let gym = Gym::detect(temp.path(), &NonInteractive).unwrap();
        assert!(gym.workspace.is_some());
        assert!(gym.project.is_none());
    }

    #[test]
    fn test_chooser_picks_among_workspaces() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("A.xcworkspace")).unwrap();
        std::fs::create_dir(temp.path().join("B.xcworkspace")).unwrap();

        let chooser = FixedChooser::new(1);
        let gym = Gym::detect(temp.path(), &chooser).unwrap();

        assert_eq!(gym.workspace, Some(temp.path().join("B.xcworkspace")));
        assert_eq!(*chooser.prompts.borrow(), vec!["Select Workspace: ".to_string()]);
    }

    #[test]
    fn test_gym_options_builds_fresh_table() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("MyApp.xcodeproj")).unwrap();

        let options = gym_options(temp.path(), &NonInteractive).unwrap();
        assert_eq!(options.len(), 12);
        assert!(default_of(&options, "project").is_some());

        std::fs::remove_dir(temp.path().join("MyApp.xcodeproj")).unwrap();
        let options = gym_options(temp.path(), &NonInteractive).unwrap();
        assert_eq!(default_of(&options, "project"), None);
    }

    #[test]
    fn test_several_projects_without_prompt_fails() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("A.xcodeproj")).unwrap();
        std::fs::create_dir(temp.path().join("B.xcodeproj")).unwrap();

        let err = Gym::detect(temp.path(), &NonInteractive).unwrap_err();
        assert!(matches!(err, ActionError::AmbiguousSelection { .. }));
    }

    #[test]
    fn test_nothing_found() {
        let temp = TempDir::new().unwrap();
        let gym = Gym::detect(temp.path(), &NonInteractive).unwrap();
        assert!(gym.workspace.is_none());
        assert!(gym.project.is_none());
    }

    #[test]
    fn test_hidden_entries_ignored() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".hidden.xcworkspace")).unwrap();
        assert!(find_bundles(temp.path(), WORKSPACE_EXTENSION).unwrap().is_empty());
    }

    #[test]
    fn test_option_table_shape() {
        let options = Gym::plain_options(None, None).unwrap();
        assert_eq!(options.len(), 12);
        assert_eq!(options.by_short("-w").unwrap().key, "workspace");
        assert_eq!(
            options.get("configuration").unwrap().default_display(),
            "Release"
        );
        assert_eq!(
            options.get("output_directory").unwrap().default_display(),
            "."
        );
        assert!(!options.get("clean").unwrap().optional);
    }

    #[test]
    fn test_output_name_strips_ipa() {
        let options = Gym::plain_options(None, None).unwrap();
        let env = HashMap::new();
        let sources = OptionSources::new(&env).with_value("output_name", "MyApp.ipa");
        let resolved = options.resolve(&sources).unwrap();
        assert_eq!(resolved.string("output_name"), Some("MyApp"));

        let sources = OptionSources::new(&env).with_value("output_name", "MyApp.ipa.backup");
        let resolved = options.resolve(&sources).unwrap();
        assert_eq!(resolved.string("output_name"), Some("MyApp.ipa.backup"));
    }

    #[test]
    fn test_missing_provisioning_profile_rejected() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.mobileprovision");

        let options = Gym::plain_options(None, None).unwrap();
        let env = HashMap::new();
        let sources = OptionSources::new(&env).with_value(
            "provisioning_profile_path",
            missing.to_string_lossy().to_string(),
        );

        let err = options.resolve(&sources).unwrap_err();
        match err {
            ConfigError::InvalidValue { field, message } => {
                assert_eq!(field, "provisioning_profile_path");
                assert!(message.starts_with("Provisioning profile not found at path"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_config_from_resolved() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().join("MyApp.xcworkspace");
        std::fs::create_dir(&workspace).unwrap();

        let options = Gym::plain_options(None, Some(&workspace)).unwrap();
        let mut env = HashMap::new();
        env.insert("GYM_SCHEME".to_string(), "MyApp".to_string());
        env.insert("GYM_CLEAN".to_string(), "true".to_string());
        let resolved = options.resolve(&OptionSources::new(&env)).unwrap();

        let config = GymConfig::from_resolved(&resolved);
        assert_eq!(config.workspace, Some(workspace.clone()));
        assert_eq!(config.scheme.as_deref(), Some("MyApp"));
        assert_eq!(config.configuration, "Release");
        assert!(config.clean);
        assert!(!config.silent);
        assert_eq!(config.ipa_path(), PathBuf::from("./MyApp.ipa"));
    }

    #[test]
    fn test_config_xcodebuild_options() {
        let config = GymConfig {
            project: Some(PathBuf::from("./MyApp.xcodeproj")),
            scheme: Some("MyApp".to_string()),
            output_directory: PathBuf::from("build"),
            output_name: Some("Store".to_string()),
            configuration: "Release".to_string(),
            provisioning_profile_name: Some("App Store".to_string()),
            clean: true,
            ..Default::default()
        };

        assert_eq!(
            config.xcodebuild_options().to_args(),
            vec![
                "-project",
                "./MyApp.xcodeproj",
                "-scheme",
                "MyApp",
                "-configuration",
                "Release",
                "-archivePath",
                "build/Store.xcarchive",
                "clean",
                "archive",
                "PROVISIONING_PROFILE_SPECIFIER=App Store",
            ]
        );
    }
}
