//! Artifact compression

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ActionError, Result};

/// Compresses a build artifact into an archive
#[async_trait]
pub trait Compressor: Send + Sync {
    /// Compress `source` into `output`, returning the archive path
    async fn compress(&self, source: &Path, output: &Path) -> Result<PathBuf>;
}

/// Writes deflated zip archives.
///
/// The source keeps its own name as the archive root, so compressing
/// `Build/MyApp.app` yields entries under `MyApp.app/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipCompressor;

#[async_trait]
impl Compressor for ZipCompressor {
    async fn compress(&self, source: &Path, output: &Path) -> Result<PathBuf> {
        let source = source.to_path_buf();
        let output = output.to_path_buf();
        tokio::task::spawn_blocking(move || zip_path(&source, &output))
            .await
            .map_err(|e| ActionError::Compression(e.to_string()))?
    }
}

fn zip_error(e: zip::result::ZipError) -> ActionError {
    ActionError::Compression(e.to_string())
}

fn entry_options(metadata: &std::fs::Metadata) -> SimpleFileOptions {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    #[cfg(unix)]
    let options = {
        use std::os::unix::fs::PermissionsExt;
        options.unix_permissions(metadata.permissions().mode())
    };
    #[cfg(not(unix))]
    let _ = metadata;

    options
}

/// Zip a file or directory tree synchronously
pub fn zip_path(source: &Path, output: &Path) -> Result<PathBuf> {
    if !source.exists() {
        return Err(ActionError::Compression(format!(
            "source not found: {}",
            source.display()
        )));
    }

    let base = source.parent().unwrap_or_else(|| Path::new(""));
    info!(source = %source.display(), output = %output.display(), "compressing artifact");

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(output)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let mut entries = 0usize;

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| ActionError::Compression(e.to_string()))?;
        let path = entry.path();
        let relative = path
            .strip_prefix(base)
            .map_err(|e| ActionError::Compression(e.to_string()))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if name.is_empty() {
            continue;
        }

        let metadata = std::fs::symlink_metadata(path)?;
        let options = entry_options(&metadata);

        if metadata.file_type().is_symlink() {
            let target = std::fs::read_link(path)?;
            zip.add_symlink(name, target.to_string_lossy(), options)
                .map_err(zip_error)?;
        } else if metadata.is_dir() {
            zip.add_directory(format!("{}/", name), options)
                .map_err(zip_error)?;
        } else {
            zip.start_file(name, options).map_err(zip_error)?;
            let mut reader = BufReader::new(File::open(path)?);
            std::io::copy(&mut reader, &mut zip)?;
        }
        entries += 1;
    }

    zip.finish().map_err(zip_error)?;
    debug!(entries, "archive written");
    Ok(output.to_path_buf())
}

/// SHA-256 of a file, hex encoded
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn entry_names(archive: &Path) -> Vec<String> {
        let file = File::open(archive).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_zip_keeps_bundle_root() {
        let temp = TempDir::new().unwrap();
        let app = temp.path().join("Build").join("MyApp.app");
        std::fs::create_dir_all(app.join("Frameworks")).unwrap();
        std::fs::write(app.join("MyApp"), b"binary").unwrap();
        std::fs::write(app.join("Info.plist"), b"<plist/>").unwrap();

        let output = temp.path().join("out").join("Result.zip");
        let written = zip_path(&app, &output).unwrap();
        assert_eq!(written, output);

        let names = entry_names(&output);
        assert!(names.contains(&"MyApp.app/".to_string()));
        assert!(names.contains(&"MyApp.app/Frameworks/".to_string()));
        assert!(names.contains(&"MyApp.app/MyApp".to_string()));
        assert!(names.contains(&"MyApp.app/Info.plist".to_string()));
        assert!(names.iter().all(|n| n.starts_with("MyApp.app/")));
    }

    #[test]
    fn test_zip_single_file() {
        let temp = TempDir::new().unwrap();
        let ipa = temp.path().join("MyApp.ipa");
        std::fs::write(&ipa, b"payload").unwrap();

        let output = temp.path().join("Result.zip");
        zip_path(&ipa, &output).unwrap();

        let file = File::open(&output).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        let mut content = String::new();
        zip.by_name("MyApp.ipa")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "payload");
    }

    #[test]
    fn test_missing_source() {
        let temp = TempDir::new().unwrap();
        let err = zip_path(&temp.path().join("Nope.app"), &temp.path().join("Result.zip"))
            .unwrap_err();
        assert!(matches!(err, ActionError::Compression(_)));
    }

    #[test]
    fn test_sha256() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("data");
        std::fs::write(&file, b"abc").unwrap();
        assert_eq!(
            sha256_file(&file).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_compressor_trait() {
        let temp = TempDir::new().unwrap();
        let app = temp.path().join("MyApp.app");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(app.join("MyApp"), b"binary").unwrap();

        let output = temp.path().join("Result.zip");
        let path = ZipCompressor.compress(&app, &output).await.unwrap();
        assert!(path.exists());
    }
}
