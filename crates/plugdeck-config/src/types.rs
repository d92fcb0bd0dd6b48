use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level plugdeck configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Filesystem locations.
    pub paths: PathsSection,
    /// Archive install limits.
    pub install: InstallSection,
    /// Logging settings.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// PathsSection
// ---------------------------------------------------------------------------

/// Filesystem locations used by the registry.
///
/// Relative values resolve against the data root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    /// Directory holding one subdirectory per installed plugin.
    pub plugins_dir: PathBuf,
    /// Directory holding the persisted registry records.
    pub state_dir: PathBuf,
    /// Directory uploaded archives are staged in during install.
    pub uploads_dir: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            plugins_dir: PathBuf::from("plugins"),
            state_dir: PathBuf::from("state"),
            uploads_dir: PathBuf::from("uploads/temp"),
        }
    }
}

impl PathsSection {
    /// Resolve `path` against `data_root` unless it is already absolute.
    #[must_use]
    pub fn resolve(data_root: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            data_root.join(path)
        }
    }
}

// ---------------------------------------------------------------------------
// InstallSection
// ---------------------------------------------------------------------------

/// Archive install settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSection {
    /// File name suffixes accepted for uploaded archives (case-insensitive).
    pub accepted_extensions: Vec<String>,
    /// Maximum number of entries in one archive.
    pub max_entries: usize,
    /// Maximum total extracted size in bytes.
    pub max_extracted_bytes: u64,
}

impl Default for InstallSection {
    fn default() -> Self {
        Self {
            accepted_extensions: vec![".tar.gz".to_owned(), ".tgz".to_owned()],
            max_entries: 10_000,
            max_extracted_bytes: 500_000_000,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Destination: `"stderr"`, `"stdout"`, or `"file"`.
    pub target: String,
    /// Log file directory when `target` is `"file"`. Relative to the data
    /// root.
    pub directory: PathBuf,
    /// Per-crate tracing directives (e.g. `["plugdeck_storage=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            target: "stderr".to_owned(),
            directory: PathBuf::from("logs"),
            directives: Vec::new(),
        }
    }
}
