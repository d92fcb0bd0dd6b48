//! Plugin state transitions.
//!
//! ```text
//! Unknown -> Discovered(disabled) -> Enabled <-> Disabled -> Deleted
//! ```
//!
//! Batch operations apply to each target independently. A failure for one
//! slug is recorded in the [`BatchReport`] and never aborts the rest.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::{info, warn};

use crate::error::{AccessError, PluginError, PluginResult};
use crate::registry::{PluginRecord, Registry};
use crate::slug::Slug;

/// Suffix the admin form appends to bulk action names.
const SELECTED_SUFFIX: &str = "-selected";

/// An action that can be applied to a selection of plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    /// Enable every selected plugin.
    Activate,
    /// Disable every selected plugin.
    Deactivate,
    /// Remove every selected (disabled) plugin.
    Delete,
}

impl BulkAction {
    /// Canonical action name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BulkAction {
    type Err = PluginError;

    /// Accepts `activate` as well as the form's `activate-selected`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_suffix(SELECTED_SUFFIX).unwrap_or(s);
        match name {
            "activate" => Ok(Self::Activate),
            "deactivate" => Ok(Self::Deactivate),
            "delete" => Ok(Self::Delete),
            _ => Err(PluginError::UnknownAction(s.to_owned())),
        }
    }
}

/// A per-target failure within a batch.
#[derive(Debug)]
pub struct BatchFailure {
    /// The target as requested.
    pub target: String,
    /// Why it failed.
    pub error: PluginError,
}

/// Outcome of a batch operation.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Targets the action was applied to, in request order.
    pub succeeded: Vec<Slug>,
    /// Targets the action could not be applied to, in request order.
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    /// Whether every target succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn fail(&mut self, target: &str, error: PluginError) {
        self.failed.push(BatchFailure {
            target: target.to_owned(),
            error,
        });
    }
}

/// De-duplicate `targets`, keeping first occurrences in order.
///
/// # Errors
///
/// Returns [`PluginError::EmptySelection`] if `targets` is empty.
pub fn selection<S: AsRef<str>>(targets: &[S]) -> PluginResult<Vec<&str>> {
    if targets.is_empty() {
        return Err(PluginError::EmptySelection);
    }
    let mut seen = HashSet::new();
    Ok(targets
        .iter()
        .map(AsRef::as_ref)
        .filter(|t| seen.insert(*t))
        .collect())
}

/// Enable each target. Already enabled plugins succeed unchanged.
///
/// # Errors
///
/// Returns [`PluginError::EmptySelection`] if `targets` is empty.
pub fn activate<S: AsRef<str>>(registry: &mut Registry, targets: &[S]) -> PluginResult<BatchReport> {
    set_enabled(registry, targets, true)
}

/// Disable each target. Settings access is revoked with the flag.
///
/// # Errors
///
/// Returns [`PluginError::EmptySelection`] if `targets` is empty.
pub fn deactivate<S: AsRef<str>>(
    registry: &mut Registry,
    targets: &[S],
) -> PluginResult<BatchReport> {
    set_enabled(registry, targets, false)
}

fn set_enabled<S: AsRef<str>>(
    registry: &mut Registry,
    targets: &[S],
    enabled: bool,
) -> PluginResult<BatchReport> {
    let mut report = BatchReport::default();
    for target in selection(targets)? {
        match registry.get_mut(target) {
            Some(record) => {
                if record.enabled != enabled {
                    record.enabled = enabled;
                    info!(slug = %record.slug(), enabled, "Plugin state changed");
                }
                report.succeeded.push(record.slug().clone());
            },
            None => report.fail(target, PluginError::UnknownSlug(target.to_owned())),
        }
    }
    Ok(report)
}

/// Delete each disabled target: remove its directory under `plugins_dir`,
/// then drop its record.
///
/// Enabled targets fail with [`PluginError::InvalidTransition`]. If the
/// directory cannot be removed the record is kept and the target fails
/// with [`PluginError::RemoveFailed`]. A directory that is already gone
/// counts as removed.
///
/// # Errors
///
/// Returns [`PluginError::EmptySelection`] if `targets` is empty.
pub fn delete<S: AsRef<str>>(
    registry: &mut Registry,
    targets: &[S],
    plugins_dir: &Path,
) -> PluginResult<BatchReport> {
    let mut report = BatchReport::default();
    for target in selection(targets)? {
        let Some(record) = registry.get(target) else {
            report.fail(target, PluginError::UnknownSlug(target.to_owned()));
            continue;
        };
        let slug = record.slug().clone();
        if record.enabled {
            report.fail(
                target,
                PluginError::InvalidTransition {
                    slug,
                    reason: "plugin must be deactivated before it can be deleted".into(),
                },
            );
            continue;
        }

        let dir = plugins_dir.join(slug.as_str());
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {},
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(slug = %slug, "Plugin directory already gone");
            },
            Err(e) => {
                warn!(slug = %slug, path = %dir.display(), error = %e, "Failed to remove plugin directory");
                report.fail(
                    target,
                    PluginError::RemoveFailed {
                        slug,
                        message: e.to_string(),
                    },
                );
                continue;
            },
        }

        registry.remove(slug.as_str());
        info!(slug = %slug, "Plugin deleted");
        report.succeeded.push(slug);
    }
    Ok(report)
}

/// Apply `action` to `targets`.
///
/// # Errors
///
/// Returns [`PluginError::EmptySelection`] if `targets` is empty.
pub fn apply<S: AsRef<str>>(
    action: BulkAction,
    registry: &mut Registry,
    targets: &[S],
    plugins_dir: &Path,
) -> PluginResult<BatchReport> {
    match action {
        BulkAction::Activate => activate(registry, targets),
        BulkAction::Deactivate => deactivate(registry, targets),
        BulkAction::Delete => delete(registry, targets, plugins_dir),
    }
}

/// Gate for the settings page of `slug`.
///
/// # Errors
///
/// [`AccessError::Missing`] first, then [`AccessError::Disabled`], then
/// [`AccessError::NoSettings`].
pub fn settings_access<'a>(registry: &'a Registry, slug: &str) -> Result<&'a PluginRecord, AccessError> {
    let record = registry
        .get(slug)
        .ok_or_else(|| AccessError::Missing(slug.to_owned()))?;
    if !record.enabled {
        return Err(AccessError::Disabled(record.slug().clone()));
    }
    if !record.manifest.has_settings {
        return Err(AccessError::NoSettings(record.slug().clone()));
    }
    Ok(record)
}
