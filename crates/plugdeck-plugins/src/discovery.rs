//! Plugin manifest discovery.
//!
//! Scans one level of subdirectories under the plugins root. A subdirectory
//! is a plugin when its name is a valid [`Slug`] and it holds a
//! `plugin.toml`. Errors in individual manifests are logged as warnings but
//! do not prevent other manifests from loading.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::PluginResult;
use crate::manifest::{MANIFEST_FILE_NAME, PluginManifest};
use crate::slug::Slug;

/// Scan `dir` for plugin manifests.
///
/// Returns a fresh mapping on every call and never writes. Hidden entries
/// (leading `.`) are skipped, which keeps install staging and backup
/// directories out of the result. A missing `dir` yields an empty mapping.
///
/// # Errors
///
/// Returns an error if `dir` exists but cannot be listed.
pub fn scan(dir: &Path) -> PluginResult<BTreeMap<Slug, PluginManifest>> {
    let mut manifests = BTreeMap::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %dir.display(), "plugins directory does not exist");
            return Ok(manifests);
        },
        Err(e) => return Err(e.into()),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            warn!(path = %path.display(), "Skipping plugin directory with non UTF-8 name");
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let slug = match Slug::new(name) {
            Ok(slug) => slug,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping plugin directory");
                continue;
            },
        };

        if !path.join(MANIFEST_FILE_NAME).is_file() {
            debug!(path = %path.display(), "No manifest, not a plugin");
            continue;
        }

        match PluginManifest::load(slug.clone(), &path) {
            Ok(manifest) => {
                debug!(slug = %slug, "Loaded plugin manifest");
                manifests.insert(slug, manifest);
            },
            Err(e) => {
                warn!(slug = %slug, error = %e, "Failed to load plugin manifest");
            },
        }
    }

    debug!(path = %dir.display(), count = manifests.len(), "Scanned plugins directory");
    Ok(manifests)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin(root: &Path, slug: &str, manifest: &str) {
        let dir = root.join(slug);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE_NAME), manifest).unwrap();
    }

    #[test]
    fn missing_root_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let found = scan(&tmp.path().join("absent")).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn root_that_is_a_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("plugins");
        std::fs::write(&file, "").unwrap();
        assert!(scan(&file).is_err());
    }

    #[test]
    fn finds_plugins_in_slug_order() {
        let tmp = tempfile::tempdir().unwrap();
        plugin(tmp.path(), "zeta", "name = \"Zeta\"\n");
        plugin(tmp.path(), "alpha", "name = \"Alpha\"\nsettings = true\n");

        let found = scan(tmp.path()).unwrap();
        let slugs: Vec<&str> = found.keys().map(Slug::as_str).collect();
        assert_eq!(slugs, ["alpha", "zeta"]);
        assert!(found["alpha"].has_settings);
    }

    #[test]
    fn skips_dirs_without_manifest_and_loose_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("empty")).unwrap();
        std::fs::write(tmp.path().join(MANIFEST_FILE_NAME), "name = \"root\"\n").unwrap();
        plugin(tmp.path(), "real", "");

        let found = scan(tmp.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("real"));
    }

    #[test]
    fn bad_manifest_does_not_hide_others() {
        let tmp = tempfile::tempdir().unwrap();
        plugin(tmp.path(), "broken", "name = [\n");
        plugin(tmp.path(), "fine", "name = \"Fine\"\n");

        let found = scan(tmp.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("fine"));
    }

    #[test]
    fn skips_hidden_and_invalid_names() {
        let tmp = tempfile::tempdir().unwrap();
        plugin(tmp.path(), ".staging-abc", "");
        plugin(tmp.path(), "has space", "");
        plugin(tmp.path(), "ok", "");

        let found = scan(tmp.path()).unwrap();
        assert_eq!(found.keys().map(Slug::as_str).collect::<Vec<_>>(), ["ok"]);
    }
}
