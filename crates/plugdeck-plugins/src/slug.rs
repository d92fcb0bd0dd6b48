//! Plugin slugs.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PluginError, PluginResult};

/// Maximum slug length in bytes.
pub const MAX_SLUG_LEN: usize = 64;

/// Unique plugin identifier: the name of the plugin's directory.
///
/// Slugs are ASCII letters, digits, `-` and `_`, at most
/// [`MAX_SLUG_LEN`] bytes, and never start with `-` or `_`. That makes
/// `plugins_root.join(slug)` always a direct child of the plugins root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Slug(String);

/// Deserialize with validation, so a tampered state file cannot smuggle a
/// path into the registry.
impl<'de> Deserialize<'de> for Slug {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl Slug {
    /// Create a new `Slug`, validating the format.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidSlug`] if the string breaks the slug rules.
    pub fn new(slug: impl Into<String>) -> PluginResult<Self> {
        let slug = slug.into();
        Self::validate(&slug)?;
        Ok(Self(slug))
    }

    /// Create a `Slug` without validation (for tests and constants).
    #[must_use]
    pub fn from_static(slug: &str) -> Self {
        Self(slug.to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(slug: &str) -> PluginResult<()> {
        if slug.is_empty() {
            return Err(PluginError::InvalidSlug("slug must not be empty".into()));
        }
        if slug.len() > MAX_SLUG_LEN {
            return Err(PluginError::InvalidSlug(format!(
                "slug exceeds {MAX_SLUG_LEN} bytes: {slug}"
            )));
        }
        if !slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(PluginError::InvalidSlug(format!(
                "slug must contain only ASCII alphanumerics, '-' and '_', got: {slug}"
            )));
        }
        if slug.starts_with(['-', '_']) {
            return Err(PluginError::InvalidSlug(format!(
                "slug must not start with '-' or '_', got: {slug}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Slug {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Slug {
    fn borrow(&self) -> &str {
        &self.0
    }
}
