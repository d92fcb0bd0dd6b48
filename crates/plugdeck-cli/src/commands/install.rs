//! CLI handler for `plugdeck install`.

use std::path::Path;

use anyhow::{Context, Result};
use plugdeck_plugins::{PluginManager, Upload};

use super::print_json;
use crate::OutputFormat;
use crate::theme::Theme;

/// Install the plugins packed in `archive`.
///
/// The installer consumes its upload, so the archive is copied to a temp
/// file first and the user's file is left untouched.
pub(crate) fn install_archive(
    manager: &PluginManager,
    archive: &Path,
    format: OutputFormat,
) -> Result<()> {
    let file_name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let copy = tempfile::Builder::new()
        .prefix("plugdeck-upload-")
        .tempfile()
        .context("failed to create temp file for upload")?;
    std::fs::copy(archive, copy.path())
        .with_context(|| format!("failed to read {}", archive.display()))?;

    let outcome = manager
        .install(&Upload::new(file_name, copy.path()))
        .with_context(|| format!("failed to install {}", archive.display()))?;

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({ "installed": outcome.installed }));
    }

    for slug in &outcome.installed {
        println!("{}", Theme::success(&format!("Installed {slug}")));
    }
    println!(
        "{}",
        Theme::dimmed("New plugins start inactive; run `plugdeck activate <slug>` to enable.")
    );
    Ok(())
}
