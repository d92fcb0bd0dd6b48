//! Registry reconciliation against disk and the state store.

#![allow(clippy::unwrap_used)]

mod common;

use common::Fixture;
use plugdeck_plugins::{ACTIVE_PLUGINS_KEY, PLUGINS_KEY, Registry, Slug};
use plugdeck_storage::{StateStore, StateStoreExt};

#[test]
fn reconcile_is_idempotent() {
    let fx = Fixture::new();
    fx.plugin("alpha", "name = \"Alpha\"\n");
    fx.plugin("beta", "name = \"Beta\"\nsettings = true\n");
    let manager = fx.manager();

    let first = manager.list().unwrap();
    let second = manager.list().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn malformed_manifest_is_invisible() {
    let fx = Fixture::new();
    fx.plugin("alpha", "name = \"Alpha\"\nsettings = true\n");
    fx.plugin("beta", "name = \"unterminated\n");

    let registry = fx.manager().list().unwrap();

    assert_eq!(registry.len(), 1);
    let alpha = registry.get("alpha").unwrap();
    assert!(!alpha.enabled);
    assert!(alpha.manifest.has_settings);
    assert!(registry.get("beta").is_none());
}

#[test]
fn enabled_flag_survives_metadata_refresh() {
    let fx = Fixture::new();
    fx.plugin("alpha", "version = \"1.0\"\n");
    let manager = fx.manager();
    manager.activate(&["alpha"]).unwrap();

    fx.plugin("alpha", "version = \"2.0\"\n");
    let registry = manager.list().unwrap();

    let alpha = registry.get("alpha").unwrap();
    assert!(alpha.enabled);
    assert_eq!(alpha.manifest.version.as_deref(), Some("2.0"));
}

#[test]
fn vanished_plugin_is_dropped_even_when_enabled() {
    let fx = Fixture::new();
    let dir = fx.plugin("alpha", "");
    fx.plugin("beta", "");
    let manager = fx.manager();
    manager.activate(&["alpha"]).unwrap();

    std::fs::remove_dir_all(dir).unwrap();
    let registry = manager.list().unwrap();

    assert!(!registry.contains("alpha"));
    assert!(registry.contains("beta"));
    let active: Vec<Slug> = fx.store.load_json(ACTIVE_PLUGINS_KEY).unwrap().unwrap();
    assert!(active.is_empty());
}

#[test]
fn returning_plugin_starts_disabled() {
    let fx = Fixture::new();
    let dir = fx.plugin("alpha", "");
    let manager = fx.manager();
    manager.activate(&["alpha"]).unwrap();

    std::fs::remove_dir_all(&dir).unwrap();
    manager.list().unwrap();
    fx.plugin("alpha", "");

    assert!(!manager.list().unwrap().get("alpha").unwrap().enabled);
}

#[test]
fn drift_is_persisted_with_derived_active_list() {
    let fx = Fixture::new();
    fx.plugin("alpha", "");
    fx.plugin("beta", "");
    let manager = fx.manager();
    manager.activate(&["beta"]).unwrap();

    let stored: Registry = fx.store.load_json(PLUGINS_KEY).unwrap().unwrap();
    assert_eq!(stored, manager.list().unwrap());
    let active: Vec<Slug> = fx.store.load_json(ACTIVE_PLUGINS_KEY).unwrap().unwrap();
    assert_eq!(active, [Slug::new("beta").unwrap()]);
}

#[test]
fn stale_active_list_is_never_trusted() {
    let fx = Fixture::new();
    fx.plugin("alpha", "");
    fx.store
        .save_json(ACTIVE_PLUGINS_KEY, &["alpha"])
        .unwrap();

    let registry = fx.manager().list().unwrap();

    assert!(!registry.get("alpha").unwrap().enabled);
}

#[test]
fn undecodable_registry_is_rebuilt() {
    let fx = Fixture::new();
    fx.plugin("alpha", "");
    fx.store.save(PLUGINS_KEY, b"{ definitely not a registry").unwrap();

    let registry = fx.manager().list().unwrap();

    assert!(registry.contains("alpha"));
    let stored: Registry = fx.store.load_json(PLUGINS_KEY).unwrap().unwrap();
    assert_eq!(stored, registry);
}

#[test]
fn missing_plugins_root_lists_nothing() {
    let fx = Fixture::new();
    std::fs::remove_dir(fx.plugins_dir()).unwrap();
    assert!(fx.manager().list().unwrap().is_empty());
}
