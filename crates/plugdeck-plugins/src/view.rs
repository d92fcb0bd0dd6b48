//! Immutable view models for the admin pages.
//!
//! Strings here are identifiers, not user-facing copy; the presentation
//! layer maps them to localized text.

use serde::Serialize;

use crate::registry::{PluginRecord, Registry};

/// Help page linked from the plugin admin pages.
pub const HELP_URL: &str = "https://goo.gl/cvLaCz";

/// Icon identifier shared by the plugin admin pages.
pub const PAGE_ICON: &str = "plug";

/// Page chrome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    /// Title identifier.
    pub title: String,
    /// Icon identifier.
    pub icon: &'static str,
    /// Help link, if the page has one.
    pub help_url: Option<&'static str>,
}

impl PageMeta {
    /// Plugin list page.
    #[must_use]
    pub fn plugins() -> Self {
        Self {
            title: "plugins".to_owned(),
            icon: PAGE_ICON,
            help_url: Some(HELP_URL),
        }
    }

    /// Settings page for the named plugin.
    #[must_use]
    pub fn settings(plugin_name: &str) -> Self {
        Self {
            title: format!("plugin_settings:{plugin_name}"),
            icon: PAGE_ICON,
            help_url: Some(HELP_URL),
        }
    }
}

/// Which plugins the list page shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    /// Every plugin.
    #[default]
    All,
    /// Enabled plugins only.
    Active,
    /// Disabled plugins only.
    Inactive,
}

impl StatusFilter {
    /// Parse the `status` query value. Anything unrecognised shows all.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("active") => Self::Active,
            Some("inactive") => Self::Inactive,
            _ => Self::All,
        }
    }

    /// Whether `record` passes this filter.
    #[must_use]
    pub fn matches(self, record: &PluginRecord) -> bool {
        match self {
            Self::All => true,
            Self::Active => record.enabled,
            Self::Inactive => !record.enabled,
        }
    }
}

/// Plugin totals for the filter tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// All registered plugins.
    pub all: usize,
    /// Enabled plugins.
    pub active: usize,
    /// Disabled plugins.
    pub inactive: usize,
}

impl StatusCounts {
    /// Count the plugins in `registry`.
    #[must_use]
    pub fn from_registry(registry: &Registry) -> Self {
        let all = registry.len();
        let active = registry.records().filter(|r| r.enabled).count();
        Self {
            all,
            active,
            inactive: all.saturating_sub(active),
        }
    }
}

/// An action offered for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginAction {
    /// Enable the plugin.
    Activate,
    /// Disable the plugin.
    Deactivate,
    /// Open the settings page.
    Settings,
    /// Delete the plugin.
    Delete,
}

impl PluginAction {
    /// Actions available for `record`, in display order.
    #[must_use]
    pub fn available_for(record: &PluginRecord) -> Vec<Self> {
        if record.enabled {
            let mut actions = vec![Self::Deactivate];
            if record.settings_reachable() {
                actions.push(Self::Settings);
            }
            actions
        } else {
            vec![Self::Activate, Self::Delete]
        }
    }
}

/// One line of plugin metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PluginDetail {
    /// Version string.
    Version {
        /// Version.
        version: String,
    },
    /// Author, linked when a URI is known.
    Author {
        /// Name.
        name: String,
        /// Homepage.
        uri: Option<String>,
    },
    /// License, linked when a URI is known.
    License {
        /// License name.
        name: String,
        /// License text location.
        uri: Option<String>,
    },
    /// Plugin homepage.
    Website {
        /// URL.
        uri: String,
    },
    /// Support contact.
    SupportEmail {
        /// Address.
        email: String,
    },
}

impl PluginDetail {
    /// Details available for `record`, in display order.
    #[must_use]
    pub fn collect(record: &PluginRecord) -> Vec<Self> {
        let m = &record.manifest;
        let mut details = Vec::new();
        if let Some(version) = &m.version {
            details.push(Self::Version {
                version: version.clone(),
            });
        }
        if let Some(name) = &m.author {
            details.push(Self::Author {
                name: name.clone(),
                uri: m.author_uri.clone(),
            });
        }
        if let Some(name) = &m.license {
            details.push(Self::License {
                name: name.clone(),
                uri: m.license_uri.clone(),
            });
        }
        if let Some(uri) = &m.plugin_uri {
            details.push(Self::Website { uri: uri.clone() });
        }
        if let Some(email) = &m.author_email {
            details.push(Self::SupportEmail {
                email: email.clone(),
            });
        }
        details
    }
}

/// A plugin as shown on the list page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginRow {
    /// The underlying record.
    pub record: PluginRecord,
    /// Actions offered for this plugin.
    pub actions: Vec<PluginAction>,
    /// Metadata lines.
    pub details: Vec<PluginDetail>,
}

impl PluginRow {
    /// Build the row for `record`.
    #[must_use]
    pub fn new(record: &PluginRecord) -> Self {
        Self {
            record: record.clone(),
            actions: PluginAction::available_for(record),
            details: PluginDetail::collect(record),
        }
    }
}

/// The plugin list page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginListView {
    /// Page chrome.
    pub page: PageMeta,
    /// Active filter.
    pub filter: StatusFilter,
    /// Totals over the whole registry, regardless of filter.
    pub counts: StatusCounts,
    /// Rows passing the filter, in slug order.
    pub rows: Vec<PluginRow>,
}

impl PluginListView {
    /// Build the list page for `registry`.
    #[must_use]
    pub fn build(registry: &Registry, filter: StatusFilter) -> Self {
        Self {
            page: PageMeta::plugins(),
            filter,
            counts: StatusCounts::from_registry(registry),
            rows: registry
                .records()
                .filter(|r| filter.matches(r))
                .map(PluginRow::new)
                .collect(),
        }
    }
}

/// The settings page of one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsView {
    /// Page chrome.
    pub page: PageMeta,
    /// The plugin being configured.
    pub plugin: PluginRecord,
}

impl SettingsView {
    /// Build the settings page for an accessible `record`.
    #[must_use]
    pub fn new(record: &PluginRecord) -> Self {
        Self {
            page: PageMeta::settings(record.manifest.display_name()),
            plugin: record.clone(),
        }
    }
}
