//! Archive install through the manager.

#![cfg(feature = "archive")]
#![allow(clippy::unwrap_used)]

mod common;

use common::{Fixture, list_names, tarball, tarball_with_raw_path};
use plugdeck_plugins::{InstallError, PluginError, Upload};

#[test]
fn installed_plugin_registers_disabled_on_next_list() {
    let fx = Fixture::new();
    let manager = fx.manager();
    let archive = tarball(&[
        ("gallery/", b""),
        ("gallery/plugin.toml", b"name = \"Gallery\"\nversion = \"0.3\"\n"),
        ("gallery/assets/", b""),
        ("gallery/assets/style.css", b"body {}"),
    ]);
    let upload = Upload::new("gallery.tar.gz", fx.upload_file(&archive));

    let outcome = manager.install(&upload).unwrap();

    assert_eq!(outcome.installed.len(), 1);
    assert_eq!(outcome.installed[0].as_str(), "gallery");
    assert!(fx.plugins_dir().join("gallery/assets/style.css").is_file());
    assert!(!upload.temp_path.exists());
    assert!(list_names(&fx.uploads_dir()).is_empty());

    let registry = manager.list().unwrap();
    let gallery = registry.get("gallery").unwrap();
    assert!(!gallery.enabled);
    assert_eq!(gallery.manifest.display_name(), "Gallery");
}

#[test]
fn traversal_archive_writes_nothing() {
    let fx = Fixture::new();
    let manager = fx.manager();
    let archive = tarball_with_raw_path(b"../escape.txt", b"pwned");
    let upload = Upload::new("evil.tar.gz", fx.upload_file(&archive));

    let err = manager.install(&upload).unwrap_err();

    assert!(matches!(
        err,
        PluginError::Install(InstallError::PathTraversal { .. })
    ));
    assert_eq!(err.category(), "upload_failed");
    assert!(!fx.tmp.path().join("escape.txt").exists());
    assert!(list_names(&fx.plugins_dir()).is_empty());
    assert!(list_names(&fx.uploads_dir()).is_empty());
    assert!(manager.list().unwrap().is_empty());
}

#[test]
fn wrong_extension_is_rejected_and_left_alone() {
    let fx = Fixture::new();
    let path = fx.upload_file(b"PK\x03\x04");
    let upload = Upload::new("plugin.zip", &path);

    let err = fx.manager().install(&upload).unwrap_err();

    assert_eq!(err.category(), "upload_bad_type");
    assert!(path.exists());
    assert!(list_names(&fx.plugins_dir()).is_empty());
}

#[test]
fn missing_upload_reports_no_file() {
    let fx = Fixture::new();
    let upload = Upload::new("plugin.tar.gz", fx.tmp.path().join("never-uploaded"));

    let err = fx.manager().install(&upload).unwrap_err();

    assert!(matches!(err, PluginError::Install(InstallError::NoFile)));
}

#[test]
fn reinstall_replaces_files_and_keeps_enabled_flag() {
    let fx = Fixture::new();
    let dir = fx.plugin("gallery", "version = \"0.1\"\n");
    std::fs::write(dir.join("obsolete.js"), "old").unwrap();
    let manager = fx.manager();
    manager.activate(&["gallery"]).unwrap();

    let archive = tarball(&[("gallery/plugin.toml", b"version = \"0.2\"\n")]);
    manager
        .install(&Upload::new("gallery.TGZ", fx.upload_file(&archive)))
        .unwrap();

    assert!(!dir.join("obsolete.js").exists());
    assert_eq!(list_names(&fx.plugins_dir()), ["gallery"]);
    let registry = manager.list().unwrap();
    let gallery = registry.get("gallery").unwrap();
    assert!(gallery.enabled);
    assert_eq!(gallery.manifest.version.as_deref(), Some("0.2"));
}

#[test]
fn archive_with_two_plugins_installs_both() {
    let fx = Fixture::new();
    let archive = tarball(&[
        ("one/plugin.toml", b""),
        ("two/plugin.toml", b"settings = true\n"),
    ]);
    let outcome = fx
        .manager()
        .install(&Upload::new("bundle.tgz", fx.upload_file(&archive)))
        .unwrap();

    let slugs: Vec<&str> = outcome.installed.iter().map(|s| s.as_str()).collect();
    assert_eq!(slugs, ["one", "two"]);
    assert_eq!(list_names(&fx.plugins_dir()), ["one", "two"]);
}
