//! The plugin registry and its reconciliation against disk.
//!
//! The filesystem decides which plugins exist; the state store decides
//! which of them are enabled. [`merge`] combines the two without I/O and
//! [`reconcile`] wraps it with a scan, a load and a conditional save.

use std::collections::BTreeMap;
use std::path::Path;

use plugdeck_storage::{StateStore, StateStoreExt, StorageError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::discovery;
use crate::error::PluginResult;
use crate::manifest::PluginManifest;
use crate::slug::Slug;

/// Store key for the full registry.
pub const PLUGINS_KEY: &str = "plugins";

/// Store key for the derived list of enabled slugs.
pub const ACTIVE_PLUGINS_KEY: &str = "active_plugins";

/// Persisted state for one plugin: its manifest plus the enabled flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    /// Metadata refreshed from disk on every reconciliation.
    #[serde(flatten)]
    pub manifest: PluginManifest,
    /// Whether the plugin is active.
    #[serde(default)]
    pub enabled: bool,
}

impl PluginRecord {
    /// A newly discovered, disabled record.
    #[must_use]
    pub fn discovered(manifest: PluginManifest) -> Self {
        Self {
            manifest,
            enabled: false,
        }
    }

    /// The plugin's slug.
    #[must_use]
    pub fn slug(&self) -> &Slug {
        &self.manifest.slug
    }

    /// Whether the settings page is reachable right now.
    #[must_use]
    pub fn settings_reachable(&self) -> bool {
        self.enabled && self.manifest.has_settings
    }
}

/// All known plugins, ordered by slug.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry(BTreeMap<Slug, PluginRecord>);

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a plugin by slug.
    #[must_use]
    pub fn get(&self, slug: &str) -> Option<&PluginRecord> {
        self.0.get(slug)
    }

    pub(crate) fn get_mut(&mut self, slug: &str) -> Option<&mut PluginRecord> {
        self.0.get_mut(slug)
    }

    /// Insert or replace a record, keyed by its own slug.
    pub fn insert(&mut self, record: PluginRecord) -> Option<PluginRecord> {
        self.0.insert(record.slug().clone(), record)
    }

    pub(crate) fn remove(&mut self, slug: &str) -> Option<PluginRecord> {
        self.0.remove(slug)
    }

    /// Whether a plugin with this slug is registered.
    #[must_use]
    pub fn contains(&self, slug: &str) -> bool {
        self.0.contains_key(slug)
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no plugins are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Records in slug order.
    pub fn records(&self) -> impl Iterator<Item = &PluginRecord> {
        self.0.values()
    }

    /// Slugs of enabled plugins, in slug order.
    #[must_use]
    pub fn active_slugs(&self) -> Vec<Slug> {
        self.records()
            .filter(|r| r.enabled)
            .map(|r| r.slug().clone())
            .collect()
    }
}

impl FromIterator<PluginRecord> for Registry {
    fn from_iter<I: IntoIterator<Item = PluginRecord>>(iter: I) -> Self {
        let mut registry = Self::new();
        for record in iter {
            registry.insert(record);
        }
        registry
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a PluginRecord;
    type IntoIter = std::collections::btree_map::Values<'a, Slug, PluginRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.values()
    }
}

/// Combine a fresh scan with the stored registry.
///
/// Scanned slugs keep their stored `enabled` flag and take their metadata
/// from the manifest. New slugs start disabled. Stored slugs missing from
/// the scan are dropped.
#[must_use]
pub fn merge(scanned: &BTreeMap<Slug, PluginManifest>, stored: &Registry) -> Registry {
    scanned
        .values()
        .map(|manifest| PluginRecord {
            manifest: manifest.clone(),
            enabled: stored.get(manifest.slug.as_str()).is_some_and(|r| r.enabled),
        })
        .collect()
}

/// The registry as last persisted.
#[derive(Debug, Clone, Default)]
pub struct StoredRegistry {
    /// Decoded registry; empty when nothing usable was stored.
    pub registry: Registry,
    /// Whether a value was present but failed to decode.
    pub corrupt: bool,
}

/// Load the persisted registry.
///
/// A value that does not decode is logged and treated as absent, with
/// [`StoredRegistry::corrupt`] set so the next save replaces it.
///
/// # Errors
///
/// Returns [`PluginError::Persistence`](crate::PluginError::Persistence) if
/// the store itself cannot be read.
pub fn load_stored(store: &dyn StateStore) -> PluginResult<StoredRegistry> {
    match store.load_json::<Registry>(PLUGINS_KEY) {
        Ok(registry) => Ok(StoredRegistry {
            registry: registry.unwrap_or_default(),
            corrupt: false,
        }),
        Err(StorageError::Serialization(message)) => {
            warn!(key = PLUGINS_KEY, error = %message, "Stored registry is unreadable, rebuilding");
            Ok(StoredRegistry {
                registry: Registry::new(),
                corrupt: true,
            })
        },
        Err(e) => Err(e.into()),
    }
}

/// Whether the stored active list differs from the one `registry` derives.
/// An absent list reads as empty and an undecodable one is always stale.
fn active_list_stale(store: &dyn StateStore, registry: &Registry) -> PluginResult<bool> {
    match store.load_json::<Vec<Slug>>(ACTIVE_PLUGINS_KEY) {
        Ok(stored) => Ok(stored.unwrap_or_default() != registry.active_slugs()),
        Err(StorageError::Serialization(message)) => {
            warn!(key = ACTIVE_PLUGINS_KEY, error = %message, "Stored active list is unreadable, rebuilding");
            Ok(true)
        },
        Err(e) => Err(e.into()),
    }
}

/// Persist `registry` and the derived active list.
///
/// # Errors
///
/// Returns [`PluginError::Persistence`](crate::PluginError::Persistence) if
/// either write fails.
pub fn persist(store: &dyn StateStore, registry: &Registry) -> PluginResult<()> {
    store.save_json(PLUGINS_KEY, registry)?;
    store.save_json(ACTIVE_PLUGINS_KEY, &registry.active_slugs())?;
    debug!(count = registry.len(), "Persisted plugin registry");
    Ok(())
}

/// Scan `plugins_dir`, merge with the stored registry, and persist if the
/// result differs from what was stored.
///
/// # Errors
///
/// Returns an error if the plugins directory cannot be listed or the store
/// cannot be read or written.
pub fn reconcile(plugins_dir: &Path, store: &dyn StateStore) -> PluginResult<Registry> {
    let scanned = discovery::scan(plugins_dir)?;
    let stored = load_stored(store)?;
    let merged = merge(&scanned, &stored.registry);

    if stored.corrupt || merged != stored.registry {
        let added = merged
            .records()
            .filter(|r| !stored.registry.contains(r.slug().as_str()))
            .count();
        let dropped = stored
            .registry
            .records()
            .filter(|r| !merged.contains(r.slug().as_str()))
            .count();
        info!(
            total = merged.len(),
            added,
            dropped,
            rebuilt = stored.corrupt,
            "Registry drift detected, persisting"
        );
        persist(store, &merged)?;
    } else if active_list_stale(store, &merged)? {
        info!(active = merged.active_slugs().len(), "Active list out of date, persisting");
        persist(store, &merged)?;
    }

    Ok(merged)
}
