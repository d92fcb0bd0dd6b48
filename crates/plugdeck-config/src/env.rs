//! Environment variable fallbacks.
//!
//! Env vars are fallback, not override: they only apply to fields that no
//! config file set.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Data root override variable.
pub const HOME_VAR: &str = "PLUGDECK_HOME";

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// All supported `PLUGDECK_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "PLUGDECK_PLUGINS_DIR",
        field_path: "paths.plugins_dir",
    },
    EnvMapping {
        var_name: "PLUGDECK_STATE_DIR",
        field_path: "paths.state_dir",
    },
    EnvMapping {
        var_name: "PLUGDECK_UPLOADS_DIR",
        field_path: "paths.uploads_dir",
    },
    EnvMapping {
        var_name: "PLUGDECK_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "PLUGDECK_LOG_FORMAT",
        field_path: "logging.format",
    },
    EnvMapping {
        var_name: "PLUGDECK_LOG_TARGET",
        field_path: "logging.target",
    },
    EnvMapping {
        var_name: "PLUGDECK_LOG_DIR",
        field_path: "logging.directory",
    },
];

/// Snapshot the process environment, restricted to `PLUGDECK_*` variables.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("PLUGDECK_"))
        .collect()
}

/// Apply environment variable fallbacks to fields that were not set by any
/// config file layer.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let set_by_file = matches!(
            sources.get(mapping.field_path),
            Some(ConfigLayer::User | ConfigLayer::Explicit)
        );
        if set_by_file {
            continue;
        }

        let Some(val) = env_vars.get(mapping.var_name) else {
            continue;
        };
        if val.is_empty() {
            continue;
        }

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_string_field(merged, mapping.field_path, val);
        sources.insert(
            mapping.field_path.to_owned(),
            ConfigLayer::Env(mapping.var_name.to_owned()),
        );
        count = count.saturating_add(1);
    }

    count
}

/// Set `section.key` in `root` to a string value, creating the section if
/// needed. Every mapped field is string-typed.
fn set_string_field(root: &mut toml::Value, path: &str, val: &str) {
    let Some((section, key)) = path.split_once('.') else {
        return;
    };
    let Some(table) = root.as_table_mut() else {
        return;
    };
    let section = table
        .entry(section.to_owned())
        .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    if let Some(section) = section.as_table_mut() {
        section.insert(key.to_owned(), toml::Value::String(val.to_owned()));
    }
}
