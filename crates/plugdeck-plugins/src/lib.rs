//! Plugin registry and lifecycle management for plugdeck.
//!
//! Provides the pieces of the plugin admin surface:
//!
//! - [`Slug`]: Validated plugin identifier (the plugin's directory name)
//! - [`PluginManifest`] / [`scan`]: Filesystem discovery of `plugin.toml` manifests
//! - [`Registry`] / [`reconcile`]: Merge of disk state with the persisted registry
//! - [`lifecycle`]: Activate, deactivate, delete and the settings access guard
//! - [`Installer`]: Safe install of plugins from uploaded `.tar.gz` archives
//! - [`view`]: Immutable view models for the list and settings pages
//! - [`PluginManager`]: Facade tying the above to a [`StateStore`](plugdeck_storage::StateStore)
//!
//! # Source of truth
//!
//! The filesystem decides which plugins exist. The store decides which are
//! enabled. A plugin directory that disappears is dropped from the registry
//! on the next reconciliation, whatever its state.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod discovery;
pub mod error;
#[cfg(feature = "archive")]
pub mod extract;
pub mod install;
pub mod lifecycle;
pub mod manager;
pub mod manifest;
pub mod registry;
pub mod slug;
pub mod view;

pub use discovery::scan;
pub use error::{AccessError, InstallError, InstallResult, PluginError, PluginResult};
#[cfg(feature = "archive")]
pub use extract::ExtractLimits;
pub use install::{InstallOptions, InstallOutcome, Installer, Upload};
pub use lifecycle::{BatchFailure, BatchReport, BulkAction};
pub use manager::PluginManager;
pub use manifest::{MANIFEST_FILE_NAME, PluginManifest};
pub use registry::{ACTIVE_PLUGINS_KEY, PLUGINS_KEY, PluginRecord, Registry, merge, reconcile};
pub use slug::Slug;
pub use view::{
    PageMeta, PluginAction, PluginDetail, PluginListView, PluginRow, SettingsView, StatusCounts,
    StatusFilter,
};
