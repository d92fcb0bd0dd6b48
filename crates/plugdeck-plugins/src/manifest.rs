//! Plugin manifest types.
//!
//! A plugin manifest (`plugin.toml`) describes a plugin's identity and
//! authorship, and whether it exposes a settings page. The slug is not part
//! of the file: it is the name of the directory the manifest lives in.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PluginError, PluginResult};
use crate::slug::Slug;

/// Standard plugin manifest file name.
pub const MANIFEST_FILE_NAME: &str = "plugin.toml";

/// Maximum manifest size (64 KiB).
pub const MAX_MANIFEST_SIZE: u64 = 65_536;

/// Descriptive metadata for one plugin, as found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Unique plugin identifier (directory name).
    pub slug: Slug,
    /// Human-readable display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Short description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Author name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Author homepage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_uri: Option<String>,
    /// Support contact address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    /// License name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// License text location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_uri: Option<String>,
    /// Plugin homepage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_uri: Option<String>,
    /// Whether the plugin exposes a settings page.
    #[serde(default)]
    pub has_settings: bool,
}

/// On-disk shape of `plugin.toml`. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct ManifestFile {
    name: Option<String>,
    version: Option<String>,
    description: Option<String>,
    author: Option<String>,
    author_uri: Option<String>,
    author_email: Option<String>,
    license: Option<String>,
    license_uri: Option<String>,
    plugin_uri: Option<String>,
    #[serde(default)]
    settings: bool,
}

impl PluginManifest {
    /// A manifest carrying only the slug.
    #[must_use]
    pub fn bare(slug: Slug) -> Self {
        Self {
            slug,
            name: None,
            version: None,
            description: None,
            author: None,
            author_uri: None,
            author_email: None,
            license: None,
            license_uri: None,
            plugin_uri: None,
            has_settings: false,
        }
    }

    /// Parse manifest text for the plugin in directory `slug`.
    ///
    /// `path` is only used for error reporting.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ManifestParseError`] if the text is not valid
    /// TOML or a recognised key has the wrong type.
    pub fn parse(slug: Slug, content: &str, path: &Path) -> PluginResult<Self> {
        let file: ManifestFile =
            toml::from_str(content).map_err(|e| PluginError::ManifestParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        Ok(Self {
            slug,
            name: non_empty(file.name),
            version: non_empty(file.version),
            description: non_empty(file.description),
            author: non_empty(file.author),
            author_uri: non_empty(file.author_uri),
            author_email: non_empty(file.author_email),
            license: non_empty(file.license),
            license_uri: non_empty(file.license_uri),
            plugin_uri: non_empty(file.plugin_uri),
            has_settings: file.settings,
        })
    }

    /// Load `plugin.toml` from `plugin_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ManifestParseError`] if the file cannot be
    /// read, exceeds [`MAX_MANIFEST_SIZE`], or does not parse.
    pub fn load(slug: Slug, plugin_dir: &Path) -> PluginResult<Self> {
        let path = plugin_dir.join(MANIFEST_FILE_NAME);
        let parse_err = |message: String| PluginError::ManifestParseError {
            path: path.clone(),
            message,
        };

        let file = File::open(&path).map_err(|e| parse_err(e.to_string()))?;
        let size = file.metadata().map_err(|e| parse_err(e.to_string()))?.len();
        if size > MAX_MANIFEST_SIZE {
            return Err(parse_err(format!(
                "manifest is {size} bytes, exceeding the {MAX_MANIFEST_SIZE} byte limit"
            )));
        }

        // The file may grow between the size check and the read.
        let mut content = String::new();
        file.take(MAX_MANIFEST_SIZE.saturating_add(1))
            .read_to_string(&mut content)
            .map_err(|e| parse_err(e.to_string()))?;
        if u64::try_from(content.len()).unwrap_or(u64::MAX) > MAX_MANIFEST_SIZE {
            return Err(parse_err(format!(
                "manifest exceeds the {MAX_MANIFEST_SIZE} byte limit"
            )));
        }

        Self::parse(slug, &content, &path)
    }

    /// Name to show for this plugin, falling back to the slug.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.slug.as_str())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> PluginResult<PluginManifest> {
        PluginManifest::parse(Slug::from_static("seo"), content, Path::new("seo/plugin.toml"))
    }

    #[test]
    fn parses_full_manifest() {
        let m = parse(
            r#"
name = "SEO Tools"
version = "1.2.0"
description = "Meta tags"
author = "Jane"
author_uri = "https://jane.example"
author_email = "jane@example.com"
license = "MIT"
license_uri = "https://opensource.org/licenses/MIT"
plugin_uri = "https://example.com/seo"
settings = true
"#,
        )
        .unwrap();

        assert_eq!(m.slug.as_str(), "seo");
        assert_eq!(m.name.as_deref(), Some("SEO Tools"));
        assert_eq!(m.version.as_deref(), Some("1.2.0"));
        assert_eq!(m.author_email.as_deref(), Some("jane@example.com"));
        assert!(m.has_settings);
    }

    #[test]
    fn empty_manifest_is_bare() {
        let m = parse("").unwrap();
        assert_eq!(m, PluginManifest::bare(Slug::from_static("seo")));
        assert_eq!(m.display_name(), "seo");
    }

    #[test]
    fn blank_values_become_absent() {
        let m = parse("name = \"\"\nversion = \"   \"\n").unwrap();
        assert!(m.name.is_none());
        assert!(m.version.is_none());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let m = parse("name = \"x\"\nhooks = [\"a\"]\n[extra]\nk = 1\n").unwrap();
        assert_eq!(m.name.as_deref(), Some("x"));
    }

    #[test]
    fn wrong_type_is_parse_error() {
        let err = parse("settings = \"yes\"\n").unwrap_err();
        assert!(matches!(err, PluginError::ManifestParseError { .. }));
    }

    #[test]
    fn load_rejects_oversized_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let padding = "#".repeat(usize::try_from(MAX_MANIFEST_SIZE).unwrap());
        std::fs::write(
            dir.path().join(MANIFEST_FILE_NAME),
            format!("{padding}\nname = \"big\"\n"),
        )
        .unwrap();

        let err = PluginManifest::load(Slug::from_static("big"), dir.path()).unwrap_err();
        assert!(err.to_string().contains("byte limit"));
    }

    #[test]
    fn load_rejects_huge_manifest_by_size_alone() {
        let dir = tempfile::tempdir().unwrap();
        // Sparse 4 GiB file; reading it into memory would be the failure.
        let file = File::create(dir.path().join(MANIFEST_FILE_NAME)).unwrap();
        file.set_len(4_294_967_296).unwrap();

        let err = PluginManifest::load(Slug::from_static("huge"), dir.path()).unwrap_err();
        assert!(matches!(err, PluginError::ManifestParseError { .. }));
        assert!(err.to_string().contains("4294967296 bytes"));
    }
}
