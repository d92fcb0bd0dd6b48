//! Archive upload install.
//!
//! Order: validate upload → stage it in the uploads directory → extract
//! into a hidden staging directory inside the plugins root → swap each
//! plugin directory into place. The staged archive and staging directory
//! are temp guards, removed on every exit path.
//!
//! Installing never touches the registry. The next reconciliation finds
//! the new plugin and registers it disabled.

use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, info, warn};

use crate::error::{InstallError, InstallResult};
#[cfg(feature = "archive")]
use crate::extract::{self, ExtractLimits};
use crate::slug::Slug;

/// An uploaded file waiting to be installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Name the client gave the file; only its suffix is trusted.
    pub file_name: String,
    /// Where the upload currently lives on disk.
    pub temp_path: PathBuf,
}

impl Upload {
    /// Create an upload descriptor.
    #[must_use]
    pub fn new(file_name: impl Into<String>, temp_path: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            temp_path: temp_path.into(),
        }
    }
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// Plugin directories placed under the plugins root.
    pub installed: Vec<Slug>,
}

/// Install settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Accepted file name suffixes, compared case-insensitively.
    pub accepted_extensions: Vec<String>,
    /// Maximum number of archive entries.
    pub max_entries: usize,
    /// Maximum total extracted size in bytes.
    pub max_extracted_bytes: u64,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            accepted_extensions: vec![".tar.gz".to_owned(), ".tgz".to_owned()],
            max_entries: 10_000,
            max_extracted_bytes: 500_000_000,
        }
    }
}

impl InstallOptions {
    /// Whether `file_name` ends with an accepted extension.
    #[must_use]
    pub fn accepts(&self, file_name: &str) -> bool {
        let lower = file_name.to_ascii_lowercase();
        self.accepted_extensions
            .iter()
            .any(|ext| lower.ends_with(&ext.to_ascii_lowercase()))
    }
}

/// Installs plugin archives into a plugins root.
#[derive(Debug, Clone)]
pub struct Installer {
    plugins_dir: PathBuf,
    uploads_dir: PathBuf,
    options: InstallOptions,
}

impl Installer {
    /// Create an installer with default options.
    #[must_use]
    pub fn new(plugins_dir: impl Into<PathBuf>, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            uploads_dir: uploads_dir.into(),
            options: InstallOptions::default(),
        }
    }

    /// Replace the install options.
    #[must_use]
    pub fn with_options(mut self, options: InstallOptions) -> Self {
        self.options = options;
        self
    }

    /// Install the plugins contained in `upload`.
    ///
    /// The upload file is moved into the uploads directory before
    /// extraction and is gone afterwards whether or not install succeeds.
    /// Rejected uploads (`NoFile`, `BadType`, `CapabilityMissing`) are left
    /// where they are.
    ///
    /// # Errors
    ///
    /// Returns an [`InstallError`] describing the first failure.
    pub fn install(&self, upload: &Upload) -> InstallResult<InstallOutcome> {
        if upload.file_name.trim().is_empty() || !upload.temp_path.is_file() {
            return Err(InstallError::NoFile);
        }
        if !cfg!(feature = "archive") {
            return Err(InstallError::CapabilityMissing {
                capability: "gzip tar extraction".into(),
            });
        }
        if !self.options.accepts(&upload.file_name) {
            return Err(InstallError::BadType {
                file_name: upload.file_name.clone(),
                accepted: self.options.accepted_extensions.join(", "),
            });
        }

        let staged = self.stage_upload(&upload.temp_path)?;
        debug!(path = %staged.display(), "Upload staged");

        let installed = self.unpack(&staged)?;
        info!(
            file = %upload.file_name,
            plugins = ?installed.iter().map(Slug::as_str).collect::<Vec<_>>(),
            "Plugin archive installed"
        );
        Ok(InstallOutcome { installed })
    }

    /// Move the upload into a uniquely named file in the uploads directory.
    fn stage_upload(&self, source: &Path) -> InstallResult<TempPath> {
        std::fs::create_dir_all(&self.uploads_dir)
            .map_err(|e| failed(format!("failed to create uploads directory: {e}")))?;

        let staged = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".archive")
            .tempfile_in(&self.uploads_dir)
            .map_err(|e| failed(format!("failed to stage upload: {e}")))?
            .into_temp_path();

        if std::fs::rename(source, &staged).is_err() {
            // Cross-filesystem upload: copy, then drop the original.
            std::fs::copy(source, &staged)
                .map_err(|e| failed(format!("failed to stage upload: {e}")))?;
            if let Err(e) = std::fs::remove_file(source) {
                warn!(path = %source.display(), error = %e, "Failed to remove original upload");
            }
        }
        Ok(staged)
    }

    #[cfg(feature = "archive")]
    fn unpack(&self, archive: &Path) -> InstallResult<Vec<Slug>> {
        std::fs::create_dir_all(&self.plugins_dir)
            .map_err(|e| failed(format!("failed to create plugins directory: {e}")))?;
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.plugins_dir)
            .map_err(|e| failed(format!("failed to create staging directory: {e}")))?;

        let limits = ExtractLimits {
            max_entries: self.options.max_entries,
            max_extracted_bytes: self.options.max_extracted_bytes,
        };
        let slugs = extract::extract_plugin_archive(archive, staging.path(), &limits)?;

        for slug in &slugs {
            swap_into_place(
                &staging.path().join(slug.as_str()),
                &self.plugins_dir.join(slug.as_str()),
            )?;
        }
        Ok(slugs)
    }

    #[cfg(not(feature = "archive"))]
    fn unpack(&self, _archive: &Path) -> InstallResult<Vec<Slug>> {
        Err(InstallError::CapabilityMissing {
            capability: "gzip tar extraction".into(),
        })
    }
}

/// Replace `target` with `staged`, keeping the previous `target` as a
/// hidden backup until the rename has succeeded.
fn swap_into_place(staged: &Path, target: &Path) -> InstallResult<()> {
    let backup = if target.exists() {
        let backup_path = backup_path_for(target)?;
        if backup_path.exists() {
            std::fs::remove_dir_all(&backup_path)
                .map_err(|e| failed(format!("failed to remove stale backup: {e}")))?;
        }
        std::fs::rename(target, &backup_path)
            .map_err(|e| failed(format!("failed to back up {}: {e}", target.display())))?;
        Some(backup_path)
    } else {
        None
    };

    if let Err(e) = std::fs::rename(staged, target) {
        if let Some(ref bp) = backup {
            if let Err(restore) = std::fs::rename(bp, target) {
                warn!(path = %target.display(), error = %restore, "Failed to restore backup");
            }
        }
        return Err(failed(format!(
            "failed to move plugin into {}: {e}",
            target.display()
        )));
    }

    if let Some(ref bp) = backup {
        if let Err(e) = std::fs::remove_dir_all(bp) {
            warn!(path = %bp.display(), error = %e, "Failed to remove backup");
        }
        debug!(path = %target.display(), "Replaced existing plugin directory");
    }
    Ok(())
}

/// `<root>/.<slug>.backup`, hidden from discovery.
fn backup_path_for(target: &Path) -> InstallResult<PathBuf> {
    let name = target
        .file_name()
        .ok_or_else(|| failed(format!("{} has no file name", target.display())))?;
    let mut backup_name = std::ffi::OsString::from(".");
    backup_name.push(name);
    backup_name.push(".backup");
    Ok(target.with_file_name(backup_name))
}

fn failed(message: String) -> InstallError {
    InstallError::ExtractionFailed { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_case_insensitive() {
        let options = InstallOptions::default();
        assert!(options.accepts("seo-1.0.TAR.GZ"));
        assert!(options.accepts("seo.tgz"));
        assert!(!options.accepts("seo.zip"));
        assert!(!options.accepts("tgz"));
    }

    #[test]
    fn missing_file_is_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let installer = Installer::new(tmp.path().join("plugins"), tmp.path().join("up"));
        let err = installer
            .install(&Upload::new("seo.tgz", tmp.path().join("absent")))
            .unwrap_err();
        assert!(matches!(err, InstallError::NoFile));
    }

    #[test]
    fn blank_name_is_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("upload");
        std::fs::write(&file, b"x").unwrap();
        let installer = Installer::new(tmp.path().join("plugins"), tmp.path().join("up"));
        let err = installer.install(&Upload::new("  ", &file)).unwrap_err();
        assert!(matches!(err, InstallError::NoFile));
    }

    #[cfg(feature = "archive")]
    #[test]
    fn wrong_extension_is_bad_type_and_file_is_left() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("upload");
        std::fs::write(&file, b"PK").unwrap();
        let installer = Installer::new(tmp.path().join("plugins"), tmp.path().join("up"));

        let err = installer.install(&Upload::new("seo.zip", &file)).unwrap_err();

        assert!(matches!(err, InstallError::BadType { .. }));
        assert!(file.exists());
        assert!(!tmp.path().join("plugins").exists());
    }

    #[cfg(not(feature = "archive"))]
    #[test]
    fn without_archive_support_capability_is_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("upload");
        std::fs::write(&file, b"x").unwrap();
        let installer = Installer::new(tmp.path().join("plugins"), tmp.path().join("up"));
        let err = installer.install(&Upload::new("seo.tgz", &file)).unwrap_err();
        assert!(matches!(err, InstallError::CapabilityMissing { .. }));
    }

    #[test]
    fn swap_replaces_existing_and_drops_backup() {
        let tmp = tempfile::tempdir().unwrap();
        let staged = tmp.path().join("staged");
        let target = tmp.path().join("seo");
        std::fs::create_dir(&staged).unwrap();
        std::fs::write(staged.join("plugin.toml"), "version = \"2\"").unwrap();
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("plugin.toml"), "version = \"1\"").unwrap();
        std::fs::write(target.join("old-only.txt"), "").unwrap();

        swap_into_place(&staged, &target).unwrap();

        let content = std::fs::read_to_string(target.join("plugin.toml")).unwrap();
        assert_eq!(content, "version = \"2\"");
        assert!(!target.join("old-only.txt").exists());
        assert!(!tmp.path().join(".seo.backup").exists());
    }

    #[test]
    fn swap_failure_restores_backup() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("seo");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("plugin.toml"), "version = \"1\"").unwrap();

        let err = swap_into_place(&tmp.path().join("never-staged"), &target).unwrap_err();

        assert!(matches!(err, InstallError::ExtractionFailed { .. }));
        let content = std::fs::read_to_string(target.join("plugin.toml")).unwrap();
        assert_eq!(content, "version = \"1\"");
    }
}
