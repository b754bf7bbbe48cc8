//! Temporary build directory

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Directory name used under the system temp dir
pub const DEFAULT_SCRATCH_DIR_NAME: &str = "liftoff_build";

/// Fresh `run-*` children tried before giving up
const MAX_RUN_DIRS: u32 = 1000;

/// Default scratch location: `<temp>/liftoff_build`
pub fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_SCRATCH_DIR_NAME)
}

/// A per-run build directory, removed when dropped.
///
/// The guard only deletes what it created: a fresh `run-*` directory under
/// the requested location, plus the location itself when the guard had to
/// create it and it is empty again afterwards. Anything else under the
/// location survives. Removal never fails the run; errors are logged.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    created_parent: Option<PathBuf>,
}

impl ScratchDir {
    /// Create a new run directory under `location`
    pub fn create(location: impl AsRef<Path>) -> std::io::Result<Self> {
        let location = location.as_ref();

        let created_parent = if location.exists() {
            None
        } else {
            std::fs::create_dir_all(location)?;
            Some(location.to_path_buf())
        };

        let pid = std::process::id();
        for attempt in 0..MAX_RUN_DIRS {
            let path = location.join(format!("run-{}-{}", pid, attempt));
            match std::fs::create_dir(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "created scratch directory");
                    return Ok(Self {
                        path,
                        created_parent,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("no free run directory under {}", location.display()),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.path.exists() {
            match std::fs::remove_dir_all(&self.path) {
                Ok(()) => debug!(path = %self.path.display(), "removed scratch directory"),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "failed to remove scratch directory")
                }
            }
        }

        // remove_dir refuses non-empty directories
        if let Some(ref parent) = self.created_parent {
            if std::fs::remove_dir(parent).is_err() {
                debug!(path = %parent.display(), "scratch location not empty, keeping it");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_removed_on_drop() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("scratch");
        {
            let scratch = ScratchDir::create(&location).unwrap();
            assert!(scratch.path().starts_with(&location));
            std::fs::create_dir_all(scratch.join("Build/Products")).unwrap();
            std::fs::write(scratch.join("Build/Products/file"), b"x").unwrap();
        }
        assert!(!location.exists());
    }

    #[test]
    fn test_existing_location_is_left_alone() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(project.join("Podfile"), b"platform :ios").unwrap();

        let run_dir = {
            let scratch = ScratchDir::create(&project).unwrap();
            std::fs::write(scratch.join("Result.zip"), b"zip").unwrap();
            scratch.path().to_path_buf()
        };

        assert!(!run_dir.exists());
        assert!(project.join("Podfile").exists());
    }

    #[test]
    fn test_created_location_kept_when_something_else_lands_in_it() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("work");
        {
            let _scratch = ScratchDir::create(&location).unwrap();
            std::fs::write(location.join("appetize_public_key.txt"), b"pub").unwrap();
        }
        assert!(location.join("appetize_public_key.txt").exists());
    }

    #[test]
    fn test_run_dirs_do_not_collide() {
        let temp = TempDir::new().unwrap();
        let first = ScratchDir::create(temp.path()).unwrap();
        let second = ScratchDir::create(temp.path()).unwrap();
        assert_ne!(first.path(), second.path());
    }

    #[test]
    fn test_removed_on_unwind() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("scratch");
        let inner = location.clone();

        let result = std::panic::catch_unwind(move || {
            let _scratch = ScratchDir::create(&inner).unwrap();
            panic!("build exploded");
        });

        assert!(result.is_err());
        assert!(!location.exists());
    }

    #[test]
    fn test_default_location() {
        assert!(default_scratch_dir().ends_with(DEFAULT_SCRATCH_DIR_NAME));
    }
}
