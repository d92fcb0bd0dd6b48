//! The plugin manager facade.
//!
//! Every call re-reads the world: it reconciles the plugins directory
//! against the store, applies its change, and writes the whole registry
//! back. Calls that may write are serialized on an in-process mutex; the
//! file store adds an advisory lock across processes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use plugdeck_storage::{FileStateStore, StateStore};
use tracing::{debug, info_span, warn};

use crate::error::{PluginError, PluginResult};
use crate::install::{InstallOptions, InstallOutcome, Installer, Upload};
use crate::lifecycle::{self, BatchReport, BulkAction};
use crate::registry::{self, Registry};
use crate::slug::Slug;
use crate::view::{PluginListView, SettingsView, StatusCounts, StatusFilter};

/// Entry point for every plugin operation.
pub struct PluginManager {
    plugins_dir: PathBuf,
    store: Arc<dyn StateStore>,
    installer: Installer,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("plugins_dir", &self.plugins_dir)
            .field("installer", &self.installer)
            .finish_non_exhaustive()
    }
}

impl PluginManager {
    /// Create a manager over `plugins_dir`, staging uploads in
    /// `uploads_dir` and persisting through `store`.
    #[must_use]
    pub fn new(
        plugins_dir: impl Into<PathBuf>,
        uploads_dir: impl Into<PathBuf>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let plugins_dir = plugins_dir.into();
        Self {
            installer: Installer::new(plugins_dir.clone(), uploads_dir),
            plugins_dir,
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Create a manager persisting to JSON files in `state_dir`.
    #[must_use]
    pub fn open(
        plugins_dir: impl Into<PathBuf>,
        uploads_dir: impl Into<PathBuf>,
        state_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::new(
            plugins_dir,
            uploads_dir,
            Arc::new(FileStateStore::new(state_dir)),
        )
    }

    /// Replace the archive install options.
    #[must_use]
    pub fn with_install_options(mut self, options: InstallOptions) -> Self {
        self.installer = self.installer.with_options(options);
        self
    }

    /// The plugins root.
    #[must_use]
    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    /// Reconciled registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the plugins root cannot be listed or the store
    /// cannot be read or written.
    pub fn list(&self) -> PluginResult<Registry> {
        let _span = info_span!("list").entered();
        let _guard = self.lock();
        self.reconcile()
    }

    /// Enable `slugs`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::EmptySelection`] for an empty selection, or a
    /// system error if reconciliation or persistence fails. Per-slug
    /// failures are in the report.
    pub fn activate<S: AsRef<str>>(&self, slugs: &[S]) -> PluginResult<BatchReport> {
        self.apply_bulk(BulkAction::Activate, slugs)
    }

    /// Disable `slugs`.
    ///
    /// # Errors
    ///
    /// See [`PluginManager::activate`].
    pub fn deactivate<S: AsRef<str>>(&self, slugs: &[S]) -> PluginResult<BatchReport> {
        self.apply_bulk(BulkAction::Deactivate, slugs)
    }

    /// Delete disabled `slugs` from disk and from the registry.
    ///
    /// # Errors
    ///
    /// See [`PluginManager::activate`].
    pub fn delete<S: AsRef<str>>(&self, slugs: &[S]) -> PluginResult<BatchReport> {
        self.apply_bulk(BulkAction::Delete, slugs)
    }

    /// Apply `action` to `slugs`.
    ///
    /// # Errors
    ///
    /// See [`PluginManager::activate`].
    pub fn apply_bulk<S: AsRef<str>>(
        &self,
        action: BulkAction,
        slugs: &[S],
    ) -> PluginResult<BatchReport> {
        let _span = info_span!("bulk", action = %action, selected = slugs.len()).entered();
        lifecycle::selection(slugs)?;

        let _guard = self.lock();
        let mut registry = self.reconcile()?;
        let before = registry.clone();
        let report = lifecycle::apply(action, &mut registry, slugs, &self.plugins_dir)?;

        let saved = if registry == before {
            Ok(())
        } else {
            registry::persist(self.store.as_ref(), &registry)
        };
        if let Err(e) = saved {
            // Deleted directories are already gone; record what happened.
            let applied: Vec<&str> = report.succeeded.iter().map(Slug::as_str).collect();
            warn!(
                action = %action,
                applied = ?applied,
                error = %e,
                "Bulk action applied but plugin state was not saved"
            );
            return Err(e);
        }
        debug!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Bulk action applied"
        );
        Ok(report)
    }

    /// Data for the settings page of `slug`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Access`] when the page is not reachable, or a
    /// system error if reconciliation fails.
    pub fn settings_view(&self, slug: &str) -> PluginResult<SettingsView> {
        let registry = self.list()?;
        let record = lifecycle::settings_access(&registry, slug)?;
        Ok(SettingsView::new(record))
    }

    /// Install the plugins in an uploaded archive.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Install`] describing the failure.
    pub fn install(&self, upload: &Upload) -> PluginResult<InstallOutcome> {
        let _span = info_span!("install", file = %upload.file_name).entered();
        let _guard = self.lock();
        self.installer.install(upload).map_err(PluginError::from)
    }

    /// The plugin list page.
    ///
    /// # Errors
    ///
    /// Returns an error if reconciliation fails.
    pub fn overview(&self, filter: StatusFilter) -> PluginResult<PluginListView> {
        Ok(PluginListView::build(&self.list()?, filter))
    }

    /// Plugin totals.
    ///
    /// # Errors
    ///
    /// Returns an error if reconciliation fails.
    pub fn counts(&self) -> PluginResult<StatusCounts> {
        Ok(StatusCounts::from_registry(&self.list()?))
    }

    fn reconcile(&self) -> PluginResult<Registry> {
        registry::reconcile(&self.plugins_dir, self.store.as_ref())
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded value is `()`, so a poisoned lock carries no bad state.
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
