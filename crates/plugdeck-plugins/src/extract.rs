//! Safe plugin archive extraction with path traversal protection.
//!
//! Extracts `.tar.gz` / `.tgz` archives while guarding against:
//! - Path traversal (`../` components)
//! - Absolute paths
//! - Symlinks, hardlinks and device nodes
//! - Excessive file counts and decompressed sizes
//!
//! Every entry must live under a top-level directory named by a valid
//! [`Slug`]; those directories are the plugins the archive installs.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;

use crate::error::{InstallError, InstallResult};
use crate::slug::Slug;

/// Default maximum number of entries allowed in an archive.
pub const MAX_ENTRY_COUNT: usize = 10_000;

/// Default maximum total extracted size (500 MB), gzip bomb protection.
pub const MAX_EXTRACTED_SIZE: u64 = 500_000_000;

/// Resource limits applied while extracting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractLimits {
    /// Maximum number of entries.
    pub max_entries: usize,
    /// Maximum sum of entry sizes in bytes.
    pub max_extracted_bytes: u64,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_entries: MAX_ENTRY_COUNT,
            max_extracted_bytes: MAX_EXTRACTED_SIZE,
        }
    }
}

/// Extract the gzip-compressed tarball at `archive` into `dest`.
///
/// Returns the slugs of the top-level plugin directories, sorted.
///
/// # Errors
///
/// Returns [`InstallError::PathTraversal`] on malicious paths,
/// [`InstallError::UnsafeEntryType`] on links and special files, and
/// [`InstallError::ExtractionFailed`] on decompression failures, limit
/// violations, files at the archive root, non-slug top-level names or an
/// empty archive.
pub fn extract_plugin_archive(
    archive: &Path,
    dest: &Path,
    limits: &ExtractLimits,
) -> InstallResult<Vec<Slug>> {
    let file = File::open(archive).map_err(|e| failed(format!("failed to open archive: {e}")))?;
    let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));

    let dest = dest
        .canonicalize()
        .map_err(|e| failed(format!("failed to canonicalize destination: {e}")))?;

    let mut entry_count = 0usize;
    let mut total_size: u64 = 0;
    let mut slugs = BTreeSet::new();

    for entry_result in archive
        .entries()
        .map_err(|e| failed(format!("failed to read archive entries: {e}")))?
    {
        let mut entry =
            entry_result.map_err(|e| failed(format!("failed to read archive entry: {e}")))?;

        entry_count = entry_count.saturating_add(1);
        if entry_count > limits.max_entries {
            return Err(failed(format!(
                "archive exceeds maximum entry count ({})",
                limits.max_entries
            )));
        }

        let entry_type = entry.header().entry_type();
        if !is_safe_entry_type(entry_type) {
            let entry_path = entry
                .path()
                .map_or_else(|_| "<unknown>".to_string(), |p| p.display().to_string());
            return Err(InstallError::UnsafeEntryType {
                entry_type: format!("{entry_type:?}"),
                path: entry_path,
            });
        }

        // `git archive` opens with a pax global header; it carries no file.
        if is_metadata_entry(entry_type) {
            continue;
        }

        let entry_size = entry
            .header()
            .size()
            .map_err(|e| failed(format!("failed to read entry size: {e}")))?;
        total_size = total_size.saturating_add(entry_size);
        if total_size > limits.max_extracted_bytes {
            return Err(failed(format!(
                "archive exceeds maximum extracted size ({} bytes)",
                limits.max_extracted_bytes
            )));
        }

        let entry_path = entry
            .path()
            .map_err(|e| failed(format!("failed to read entry path: {e}")))?
            .into_owned();

        validate_entry_path(&entry_path)?;

        let relative = strip_current_dir(&entry_path);
        let mut components = relative.components();
        let Some(top) = components.next() else {
            // The archive's own `./` entry.
            continue;
        };
        let is_root_level = components.next().is_none();
        let top = top.as_os_str().to_string_lossy().into_owned();
        if is_root_level && entry_type != tar::EntryType::Directory {
            return Err(failed(format!(
                "file '{top}' at archive root; plugins must be packaged as directories"
            )));
        }
        let slug = Slug::new(top.as_str()).map_err(|_| {
            failed(format!(
                "top-level entry '{top}' is not a valid plugin directory name"
            ))
        })?;

        let target = dest.join(&relative);

        // A symlink already on disk could still redirect the write.
        if let Some(canonical_parent) = target.parent().and_then(|p| p.canonicalize().ok()) {
            let canonical_target = canonical_parent.join(target.file_name().unwrap_or_default());
            if !canonical_target.starts_with(&dest) {
                return Err(InstallError::PathTraversal {
                    path: entry_path.display().to_string(),
                });
            }
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                failed(format!("failed to create directory {}: {e}", parent.display()))
            })?;
        }

        entry
            .unpack(&target)
            .map_err(|e| failed(format!("failed to unpack {}: {e}", entry_path.display())))?;

        slugs.insert(slug);
    }

    if entry_count == 0 {
        return Err(failed("archive is empty".into()));
    }
    if slugs.is_empty() {
        return Err(failed("archive contains no plugin directories".into()));
    }

    debug!(entries = entry_count, bytes = total_size, plugins = slugs.len(), "Extracted archive");
    Ok(slugs.into_iter().collect())
}

/// Check whether a tar entry type is safe to extract.
///
/// Allows regular files, directories, and metadata headers. Rejects
/// symlinks, hardlinks, block/char devices, FIFOs, and GNU sparse entries.
fn is_safe_entry_type(entry_type: tar::EntryType) -> bool {
    matches!(
        entry_type,
        tar::EntryType::Regular
            | tar::EntryType::Directory
            | tar::EntryType::GNULongName
            | tar::EntryType::XHeader
            | tar::EntryType::XGlobalHeader
    )
}

/// Header-only entries that describe other entries.
fn is_metadata_entry(entry_type: tar::EntryType) -> bool {
    matches!(
        entry_type,
        tar::EntryType::GNULongName | tar::EntryType::XHeader | tar::EntryType::XGlobalHeader
    )
}

/// Validate that an entry path has no traversal components or absolute paths.
fn validate_entry_path(path: &Path) -> InstallResult<()> {
    if path.is_absolute() {
        return Err(InstallError::PathTraversal {
            path: path.display().to_string(),
        });
    }

    for component in path.components() {
        if matches!(
            component,
            Component::ParentDir | Component::Prefix(_) | Component::RootDir
        ) {
            return Err(InstallError::PathTraversal {
                path: path.display().to_string(),
            });
        }
    }

    Ok(())
}

/// Drop `.` components so `./seo/plugin.toml` and `seo/plugin.toml` agree.
fn strip_current_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn failed(message: String) -> InstallError {
    InstallError::ExtractionFailed { message }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use std::io::Write;

    use super::*;

    /// Gzipped tarball with the given entries; paths ending in `/` become
    /// directories.
    fn tarball(entries: &[(&str, &[u8])]) -> Vec<u8> {
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

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    /// Single raw tar entry, bypassing the tar crate's path validation.
    fn raw_entry(path: &[u8], typeflag: u8, size: u64, link: &[u8], data: &[u8]) -> Vec<u8> {
        let mut header = [0u8; 512];
        let len = path.len().min(100);
        header[..len].copy_from_slice(&path[..len]);
        header[100..108].copy_from_slice(b"0000644\0");
        let size_str = format!("{size:011o}\0");
        header[124..136].copy_from_slice(size_str.as_bytes());
        header[156] = typeflag;
        header[157..157 + link.len()].copy_from_slice(link);
        header[148..156].copy_from_slice(b"        ");
        let cksum: u32 = header.iter().map(|&b| u32::from(b)).sum();
        let cksum_str = format!("{cksum:06o}\0 ");
        header[148..156].copy_from_slice(cksum_str.as_bytes());

        let mut tar_data = Vec::new();
        tar_data.extend_from_slice(&header);
        tar_data.extend_from_slice(data);
        let padding = (512 - (data.len() % 512)) % 512;
        tar_data.extend(std::iter::repeat_n(0u8, padding));
        tar_data.extend(std::iter::repeat_n(0u8, 1024));
        gzip(&tar_data)
    }

    fn extract(tgz: &[u8]) -> (tempfile::TempDir, InstallResult<Vec<Slug>>) {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("upload.tgz");
        std::fs::write(&archive, tgz).unwrap();
        let dest = tmp.path().join("out");
        std::fs::create_dir(&dest).unwrap();
        let result = extract_plugin_archive(&archive, &dest, &ExtractLimits::default());
        (tmp, result)
    }

    #[test]
    fn extracts_plugin_directories() {
        let tgz = tarball(&[
            ("seo/", b""),
            ("seo/plugin.toml", b"name = \"SEO\"\n"),
            ("seo/src/main.php", b"<?php"),
            ("gallery/plugin.toml", b""),
        ]);
        let (tmp, result) = extract(&tgz);

        let slugs = result.unwrap();
        assert_eq!(
            slugs.iter().map(Slug::as_str).collect::<Vec<_>>(),
            ["gallery", "seo"]
        );
        assert!(tmp.path().join("out/seo/src/main.php").exists());
        assert!(tmp.path().join("out/gallery/plugin.toml").exists());
    }

    #[test]
    fn pax_global_header_is_skipped() {
        let comment = b"52 comment=0123456789abcdef0123456789abcdef01234567\n";
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_ustar();
        header.set_path("pax_global_header").unwrap();
        header.set_entry_type(tar::EntryType::XGlobalHeader);
        header.set_size(comment.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, &comment[..]).unwrap();
        let mut header = tar::Header::new_ustar();
        header.set_path("seo/plugin.toml").unwrap();
        header.set_size(0);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, std::io::empty()).unwrap();
        let tgz = gzip(&builder.into_inner().unwrap());

        let (tmp, result) = extract(&tgz);

        assert_eq!(result.unwrap()[0].as_str(), "seo");
        assert!(tmp.path().join("out/seo/plugin.toml").exists());
        assert!(!tmp.path().join("out/pax_global_header").exists());
    }

    #[test]
    fn leading_current_dir_is_ignored() {
        let tgz = tarball(&[("./", b""), ("./seo/plugin.toml", b"")]);
        let (tmp, result) = extract(&tgz);
        assert_eq!(result.unwrap()[0].as_str(), "seo");
        assert!(tmp.path().join("out/seo/plugin.toml").exists());
    }

    #[test]
    fn reject_path_traversal() {
        let tgz = raw_entry(b"seo/../../../etc/passwd", b'0', 9, b"", b"malicious");
        let (_tmp, result) = extract(&tgz);
        assert!(matches!(result, Err(InstallError::PathTraversal { .. })));
    }

    #[test]
    fn reject_absolute_path() {
        let tgz = raw_entry(b"/etc/passwd", b'0', 9, b"", b"malicious");
        let (_tmp, result) = extract(&tgz);
        assert!(matches!(result, Err(InstallError::PathTraversal { .. })));
    }

    #[test]
    fn reject_symlink_entry() {
        let tgz = raw_entry(b"seo/evil-link", b'2', 0, b"/etc/passwd", b"");
        let (_tmp, result) = extract(&tgz);
        assert!(matches!(result, Err(InstallError::UnsafeEntryType { .. })));
    }

    #[test]
    fn reject_hardlink_entry() {
        let tgz = raw_entry(b"seo/evil-hard", b'1', 0, b"seo/plugin.toml", b"");
        let (_tmp, result) = extract(&tgz);
        assert!(matches!(result, Err(InstallError::UnsafeEntryType { .. })));
    }

    #[test]
    fn reject_file_at_root() {
        let tgz = tarball(&[("README.md", b"hi")]);
        let (_tmp, result) = extract(&tgz);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("archive root"), "got: {err}");
    }

    #[test]
    fn reject_non_slug_top_level() {
        let tgz = tarball(&[("my plugin/plugin.toml", b"")]);
        let (_tmp, result) = extract(&tgz);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("not a valid plugin directory name"), "got: {err}");
    }

    #[test]
    fn reject_empty_archive() {
        let tgz = tarball(&[]);
        let (_tmp, result) = extract(&tgz);
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn reject_not_gzip() {
        let (_tmp, result) = extract(b"PK\x03\x04 definitely a zip");
        assert!(matches!(result, Err(InstallError::ExtractionFailed { .. })));
    }

    #[test]
    fn reject_oversized_entry_count() {
        let entries: Vec<(String, Vec<u8>)> = (0..=3)
            .map(|i| (format!("seo/file_{i}.txt"), vec![b'a']))
            .collect();
        let refs: Vec<(&str, &[u8])> = entries
            .iter()
            .map(|(p, d)| (p.as_str(), d.as_slice()))
            .collect();
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("a.tgz");
        std::fs::write(&archive, tarball(&refs)).unwrap();
        let limits = ExtractLimits {
            max_entries: 3,
            ..ExtractLimits::default()
        };

        let err = extract_plugin_archive(&archive, tmp.path(), &limits).unwrap_err();
        assert!(err.to_string().contains("maximum entry count"), "got: {err}");
    }

    #[test]
    fn reject_gzip_bomb() {
        let claimed = MAX_EXTRACTED_SIZE + 1;
        let tgz = raw_entry(b"seo/bomb.bin", b'0', claimed, b"", b"small");
        let (_tmp, result) = extract(&tgz);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("maximum extracted size"), "got: {err}");
    }

    #[test]
    fn validate_entry_path_ok() {
        validate_entry_path(Path::new("seo/plugin.toml")).unwrap();
        validate_entry_path(Path::new("./seo/deep/file.php")).unwrap();
    }
}
