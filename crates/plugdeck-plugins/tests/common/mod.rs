//! Shared fixtures for plugdeck-plugins integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use plugdeck_plugins::{MANIFEST_FILE_NAME, PluginManager};
use plugdeck_storage::{MemoryStateStore, StateStore};

/// Scratch layout: `<tmp>/plugins`, `<tmp>/uploads`, `<tmp>/state`.
pub struct Fixture {
    pub tmp: tempfile::TempDir,
    pub store: Arc<MemoryStateStore>,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("plugins")).unwrap();
        Self {
            tmp,
            store: Arc::new(MemoryStateStore::new()),
        }
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.tmp.path().join("plugins")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.tmp.path().join("uploads")
    }

    pub fn manager(&self) -> PluginManager {
        let store: Arc<dyn StateStore> = self.store.clone();
        PluginManager::new(self.plugins_dir(), self.uploads_dir(), store)
    }

    /// Write `<plugins>/<slug>/plugin.toml`.
    pub fn plugin(&self, slug: &str, manifest: &str) -> PathBuf {
        let dir = self.plugins_dir().join(slug);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE_NAME), manifest).unwrap();
        dir
    }

    /// Write `bytes` to a fresh upload temp file and return its path.
    pub fn upload_file(&self, bytes: &[u8]) -> PathBuf {
        let incoming = self.tmp.path().join("incoming");
        std::fs::create_dir_all(&incoming).unwrap();
        let path = incoming.join("php-upload.tmp");
        std::fs::write(&path, bytes).unwrap();
        path
    }
}

/// Entries in `dir`, sorted, as file names.
pub fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

/// Gzipped tarball; paths ending in `/` become directories.
pub fn tarball(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for &(path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_path(path).unwrap();
        if path.ends_with('/') {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_size(0);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append(&header, std::io::empty()).unwrap();
        } else {
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, data).unwrap();
        }
    }
    gzip(&builder.into_inner().unwrap())
}

/// Gzipped tarball holding a legitimate entry followed by one regular file
/// entry with raw `path` bytes, bypassing the tar crate's path checks.
pub fn tarball_with_raw_path(path: &[u8], data: &[u8]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_path("evil/plugin.toml").unwrap();
    header.set_size(0);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append(&header, std::io::empty()).unwrap();
    let mut tar_data = builder.into_inner().unwrap();
    // Drop the end-of-archive marker so the raw entry follows.
    tar_data.truncate(tar_data.len() - 1024);

    let mut raw = [0u8; 512];
    let len = path.len().min(100);
    raw[..len].copy_from_slice(&path[..len]);
    raw[100..108].copy_from_slice(b"0000644\0");
    let size_str = format!("{:011o}\0", data.len());
    raw[124..136].copy_from_slice(size_str.as_bytes());
    raw[156] = b'0';
    raw[148..156].copy_from_slice(b"        ");
    let cksum: u32 = raw.iter().map(|&b| u32::from(b)).sum();
    let cksum_str = format!("{cksum:06o}\0 ");
    raw[148..156].copy_from_slice(cksum_str.as_bytes());

    tar_data.extend_from_slice(&raw);
    tar_data.extend_from_slice(data);
    let padding = (512 - (data.len() % 512)) % 512;
    tar_data.extend(std::iter::repeat_n(0u8, padding));
    tar_data.extend(std::iter::repeat_n(0u8, 1024));
    gzip(&tar_data)
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
