//! Plugin lifecycle commands: list, activate, deactivate, delete, settings.

use anyhow::{Context, Result, bail};
use plugdeck_plugins::{
    BatchReport, BulkAction, PluginDetail, PluginManager, PluginRow, StatusFilter,
};
use serde_json::json;

use super::print_json;
use crate::OutputFormat;
use crate::theme::Theme;

/// Print the plugin list, optionally filtered by `status`.
pub(crate) fn list_plugins(
    manager: &PluginManager,
    status: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let view = manager
        .overview(StatusFilter::parse(status))
        .context("failed to list plugins")?;

    if format == OutputFormat::Json {
        return print_json(&view);
    }

    println!("{}", Theme::header("Plugins"));
    println!(
        "{}",
        Theme::dimmed(&format!(
            "All ({}) | Active ({}) | Inactive ({})",
            view.counts.all, view.counts.active, view.counts.inactive
        ))
    );
    if view.rows.is_empty() {
        println!("{}", Theme::info("No plugins found"));
        return Ok(());
    }

    println!("  {:<24} {:<24} {:<10} STATUS", "SLUG", "NAME", "VERSION");
    println!("{}", Theme::separator());
    for row in &view.rows {
        print_row(row);
    }
    println!(
        "\n{}",
        Theme::dimmed(&format!("{} plugin(s)", view.rows.len()))
    );
    Ok(())
}

fn print_row(row: &PluginRow) {
    let manifest = &row.record.manifest;
    println!(
        "  {:<24} {:<24} {:<10} {}",
        manifest.slug,
        manifest.display_name(),
        manifest.version.as_deref().unwrap_or("-"),
        Theme::status(row.record.enabled)
    );
    if let Some(description) = &manifest.description {
        println!("      {}", Theme::dimmed(description));
    }
}

/// Apply the named bulk action to `slugs`.
///
/// Fails after printing the report if any slug failed.
pub(crate) fn run_bulk(
    manager: &PluginManager,
    action: &str,
    slugs: &[String],
    format: OutputFormat,
) -> Result<()> {
    let action: BulkAction = action.parse()?;
    let report = manager.apply_bulk(action, slugs)?;

    if format == OutputFormat::Json {
        print_json(&report_json(action, &report))?;
    } else {
        print_report(action, &report);
    }

    if !report.is_success() {
        bail!(
            "{} of {} plugin(s) failed to {action}",
            report.failed.len(),
            report.failed.len().saturating_add(report.succeeded.len())
        );
    }
    Ok(())
}

fn report_json(action: BulkAction, report: &BatchReport) -> serde_json::Value {
    let failed: Vec<_> = report
        .failed
        .iter()
        .map(|f| {
            json!({
                "target": f.target,
                "category": f.error.category(),
                "message": f.error.to_string(),
            })
        })
        .collect();
    json!({
        "action": action.as_str(),
        "succeeded": report.succeeded,
        "failed": failed,
    })
}

fn print_report(action: BulkAction, report: &BatchReport) {
    let verb = match action {
        BulkAction::Activate => "Activated",
        BulkAction::Deactivate => "Deactivated",
        BulkAction::Delete => "Deleted",
    };
    for slug in &report.succeeded {
        println!("{}", Theme::success(&format!("{verb} {slug}")));
    }
    for failure in &report.failed {
        eprintln!(
            "{}",
            Theme::error(&format!("{}: {}", failure.target, failure.error))
        );
    }
}

/// Print the settings page data for `slug`.
pub(crate) fn show_settings(manager: &PluginManager, slug: &str, format: OutputFormat) -> Result<()> {
    let view = manager.settings_view(slug)?;

    if format == OutputFormat::Json {
        return print_json(&view);
    }

    let manifest = &view.plugin.manifest;
    println!("{}", Theme::header(manifest.display_name()));
    println!("{}", Theme::separator());
    println!("{}", Theme::kv("Slug", manifest.slug.as_str()));
    for detail in PluginDetail::collect(&view.plugin) {
        println!("{}", detail_line(&detail));
    }
    if let Some(help) = view.page.help_url {
        println!("\n{}", Theme::dimmed(&format!("Help: {help}")));
    }
    Ok(())
}

fn detail_line(detail: &PluginDetail) -> String {
    let linked = |text: &str, uri: Option<&String>| match uri {
        Some(uri) => format!("{text} <{uri}>"),
        None => text.to_owned(),
    };
    match detail {
        PluginDetail::Version { version } => Theme::kv("Version", version),
        PluginDetail::Author { name, uri } => Theme::kv("Author", &linked(name, uri.as_ref())),
        PluginDetail::License { name, uri } => Theme::kv("License", &linked(name, uri.as_ref())),
        PluginDetail::Website { uri } => Theme::kv("Website", uri),
        PluginDetail::SupportEmail { email } => Theme::kv("Support", email),
    }
}

/// Print plugin totals.
pub(crate) fn show_counts(manager: &PluginManager, format: OutputFormat) -> Result<()> {
    let counts = manager.counts().context("failed to count plugins")?;

    if format == OutputFormat::Json {
        return print_json(&counts);
    }

    println!("{}", Theme::kv("All", &counts.all.to_string()));
    println!("{}", Theme::kv("Active", &counts.active.to_string()));
    println!("{}", Theme::kv("Inactive", &counts.inactive.to_string()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use plugdeck_plugins::{PluginError, Slug};
    use plugdeck_storage::MemoryStateStore;

    use super::*;

    fn manager(root: &Path) -> PluginManager {
        PluginManager::new(
            root.join("plugins"),
            root.join("uploads"),
            Arc::new(MemoryStateStore::new()),
        )
    }

    #[test]
    fn report_json_carries_failure_categories() {
        let report = BatchReport {
            succeeded: vec![Slug::from_static("seo")],
            failed: vec![plugdeck_plugins::BatchFailure {
                target: "ghost".into(),
                error: PluginError::UnknownSlug("ghost".into()),
            }],
        };

        let value = report_json(BulkAction::Activate, &report);

        assert_eq!(value["action"], "activate");
        assert_eq!(value["succeeded"][0], "seo");
        assert_eq!(value["failed"][0]["category"], "plugin_missing");
    }

    #[test]
    fn bulk_with_failures_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("plugins/seo")).unwrap();
        std::fs::write(tmp.path().join("plugins/seo/plugin.toml"), "").unwrap();
        let m = manager(tmp.path());

        let slugs = vec!["seo".to_owned(), "ghost".to_owned()];
        let err = run_bulk(&m, "activate-selected", &slugs, OutputFormat::Json).unwrap_err();

        assert!(err.to_string().contains("1 of 2"));
        assert!(m.list().unwrap().get("seo").unwrap().enabled);
    }

    #[test]
    fn unknown_bulk_action_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let slugs = vec!["seo".to_owned()];
        assert!(run_bulk(&manager(tmp.path()), "purge", &slugs, OutputFormat::Json).is_err());
    }

    #[test]
    fn detail_lines_link_uris() {
        let line = detail_line(&PluginDetail::Author {
            name: "Jane".into(),
            uri: Some("https://jane.dev".into()),
        });
        assert!(line.contains("Jane <https://jane.dev>"));
    }
}
