//! CLI handler for `plugdeck config`.

use anyhow::Result;
use plugdeck_config::{ResolvedConfig, ShowFormat};

use crate::OutputFormat;

/// Show the resolved configuration with source annotations.
pub(crate) fn show_config(resolved: &ResolvedConfig, format: OutputFormat) -> Result<()> {
    let show_format = match format {
        OutputFormat::Json => ShowFormat::Json,
        OutputFormat::Pretty => ShowFormat::Toml,
    };

    let output = resolved
        .show(show_format)
        .map_err(|e| anyhow::anyhow!("failed to format config: {e}"))?;

    println!("{output}");
    Ok(())
}
