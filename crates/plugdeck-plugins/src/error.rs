//! Plugin error types.

use std::path::PathBuf;

use plugdeck_storage::StorageError;

use crate::slug::Slug;

/// Errors from plugin registry and lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Failed to parse a plugin manifest file.
    #[error("manifest parse error in {path}: {message}")]
    ManifestParseError {
        /// Path to the manifest file.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// The string is not a well-formed plugin slug.
    #[error("invalid plugin slug: {0}")]
    InvalidSlug(String),

    /// No plugin with this slug is registered.
    #[error("plugin not found: {0}")]
    UnknownSlug(String),

    /// The requested state change is not allowed from the current state.
    #[error("cannot change plugin {slug}: {reason}")]
    InvalidTransition {
        /// The plugin that was targeted.
        slug: Slug,
        /// Why the transition was refused.
        reason: String,
    },

    /// The plugin directory could not be removed; the record was kept.
    #[error("failed to remove plugin {slug}: {message}")]
    RemoveFailed {
        /// The plugin whose directory survived.
        slug: Slug,
        /// Underlying failure.
        message: String,
    },

    /// A batch operation was requested with no targets.
    #[error("no plugins selected")]
    EmptySelection,

    /// The bulk action name is not recognised.
    #[error("unknown bulk action: {0}")]
    UnknownAction(String),

    /// Settings page access was refused.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Archive install failed.
    #[error(transparent)]
    Install(#[from] InstallError),

    /// The state store could not be read or written.
    #[error("persistence error: {0}")]
    Persistence(#[from] StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PluginError {
    /// Stable machine-readable category for the presentation layer.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::ManifestParseError { .. } => "manifest_invalid",
            Self::InvalidSlug(_) => "invalid_slug",
            Self::UnknownSlug(_) => "plugin_missing",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::RemoveFailed { .. } => "delete_failed",
            Self::EmptySelection => "empty_selection",
            Self::UnknownAction(_) => "unknown_action",
            Self::Access(e) => e.category(),
            Self::Install(e) => e.category(),
            Self::Persistence(_) => "persistence",
            Self::Io(_) => "io",
        }
    }
}

/// Reasons a settings page is not reachable.
///
/// Checked in declaration order: a missing plugin is reported before a
/// disabled one, and a disabled one before one without settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// No plugin with this slug is registered.
    #[error("plugin not found: {0}")]
    Missing(String),

    /// The plugin exists but is not enabled.
    #[error("plugin {0} is disabled")]
    Disabled(Slug),

    /// The plugin does not expose a settings page.
    #[error("plugin {0} has no settings page")]
    NoSettings(Slug),
}

impl AccessError {
    /// Stable machine-readable category.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Missing(_) => "plugin_missing",
            Self::Disabled(_) => "settings_disabled",
            Self::NoSettings(_) => "settings_missing",
        }
    }
}

/// Errors from archive upload and extraction.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// No file was supplied with the upload.
    #[error("no file uploaded")]
    NoFile,

    /// The uploaded file name does not carry an accepted archive extension.
    #[error("unsupported archive type: {file_name} (accepted: {accepted})")]
    BadType {
        /// Declared name of the upload.
        file_name: String,
        /// Comma-separated accepted extensions.
        accepted: String,
    },

    /// Staging, decompression or unpacking failed.
    #[error("extraction failed: {message}")]
    ExtractionFailed {
        /// Failure description.
        message: String,
    },

    /// An archive entry would land outside the destination.
    #[error("path traversal detected in archive entry: {path}")]
    PathTraversal {
        /// Offending entry path.
        path: String,
    },

    /// An archive entry is a symlink, hardlink, device or similar.
    #[error("unsafe archive entry type {entry_type} at {path}")]
    UnsafeEntryType {
        /// Debug rendering of the tar entry type.
        entry_type: String,
        /// Offending entry path.
        path: String,
    },

    /// This build cannot unpack archives.
    #[error("archive support is not available: {capability}")]
    CapabilityMissing {
        /// Name of the missing capability.
        capability: String,
    },
}

impl InstallError {
    /// Stable machine-readable category.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::NoFile => "upload_no_file",
            Self::BadType { .. } => "upload_bad_type",
            Self::CapabilityMissing { .. } => "upload_unsupported",
            Self::ExtractionFailed { .. }
            | Self::PathTraversal { .. }
            | Self::UnsafeEntryType { .. } => "upload_failed",
        }
    }
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Result type for install operations.
pub type InstallResult<T> = Result<T, InstallError>;
