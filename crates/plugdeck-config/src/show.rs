//! Source-annotated display for `config show`.

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use crate::merge::{ConfigLayer, FieldSources};
use crate::types::{Config, PathsSection};

/// A resolved configuration together with source annotations.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final merged configuration.
    pub config: Config,
    /// Directory relative paths resolve against.
    pub data_root: PathBuf,
    /// Dotted field path → which layer set the value.
    pub field_sources: FieldSources,
    /// Config file paths that were loaded (in precedence order).
    pub loaded_files: Vec<String>,
}

/// Output format for `config show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowFormat {
    /// TOML with inline comments showing source.
    Toml,
    /// JSON (for programmatic consumption).
    Json,
}

impl ResolvedConfig {
    /// Absolute plugins directory.
    #[must_use]
    pub fn plugins_dir(&self) -> PathBuf {
        PathsSection::resolve(&self.data_root, &self.config.paths.plugins_dir)
    }

    /// Absolute state directory.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        PathsSection::resolve(&self.data_root, &self.config.paths.state_dir)
    }

    /// Absolute uploads staging directory.
    #[must_use]
    pub fn uploads_dir(&self) -> PathBuf {
        PathsSection::resolve(&self.data_root, &self.config.paths.uploads_dir)
    }

    /// Absolute log file directory.
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        PathsSection::resolve(&self.data_root, &self.config.logging.directory)
    }

    /// The data root.
    #[must_use]
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Which layer set `field` (`Defaults` when no layer recorded it).
    #[must_use]
    pub fn source_of(&self, field: &str) -> ConfigLayer {
        self.field_sources
            .get(field)
            .cloned()
            .unwrap_or(ConfigLayer::Defaults)
    }

    /// Format the resolved config.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn show(&self, format: ShowFormat) -> Result<String, fmt::Error> {
        match format {
            ShowFormat::Toml => self.show_toml(),
            ShowFormat::Json => serde_json::to_string_pretty(&self.config).map_err(|_| fmt::Error),
        }
    }

    fn show_toml(&self) -> Result<String, fmt::Error> {
        let toml_str = toml::to_string_pretty(&self.config).map_err(|_| fmt::Error)?;

        let mut output = String::new();
        output.push_str("# Resolved plugdeck configuration\n");
        writeln!(output, "# Data root: {}", self.data_root.display())?;
        if !self.loaded_files.is_empty() {
            output.push_str("#\n# Loaded files (in precedence order):\n");
            for (i, path) in self.loaded_files.iter().enumerate() {
                writeln!(output, "#   {}. {path}", i.saturating_add(1))?;
            }
        }
        output.push('\n');

        let mut section = String::new();
        for line in toml_str.lines() {
            let trimmed = line.trim();
            if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
                header.clone_into(&mut section);
                output.push_str(line);
                output.push('\n');
                continue;
            }
            match annotation_key(trimmed) {
                Some(key) => {
                    let path = if section.is_empty() {
                        key.to_owned()
                    } else {
                        format!("{section}.{key}")
                    };
                    writeln!(output, "{line}  # [{}]", self.source_of(&path))?;
                },
                None => {
                    output.push_str(line);
                    output.push('\n');
                },
            }
        }

        Ok(output)
    }
}

fn annotation_key(trimmed: &str) -> Option<&str> {
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let (key, _) = trimmed.split_once('=')?;
    Some(key.trim())
}
