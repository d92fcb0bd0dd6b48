use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];
const LOG_TARGETS: &[&str] = &["stderr", "stdout", "file"];

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] naming the first offending field.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_paths(config)?;
    validate_install(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_paths(config: &Config) -> ConfigResult<()> {
    let fields = [
        ("paths.plugins_dir", &config.paths.plugins_dir),
        ("paths.state_dir", &config.paths.state_dir),
        ("paths.uploads_dir", &config.paths.uploads_dir),
    ];
    for (field, path) in fields {
        if path.as_os_str().is_empty() {
            return Err(invalid(field, "path must not be empty"));
        }
    }
    if config.paths.plugins_dir == config.paths.state_dir {
        return Err(invalid(
            "paths.state_dir",
            "state directory must differ from the plugins directory",
        ));
    }
    Ok(())
}

fn validate_install(config: &Config) -> ConfigResult<()> {
    let install = &config.install;
    if install.accepted_extensions.is_empty() {
        return Err(invalid(
            "install.accepted_extensions",
            "at least one archive extension is required",
        ));
    }
    if let Some(bad) = install
        .accepted_extensions
        .iter()
        .find(|ext| !ext.starts_with('.') || ext.len() < 2)
    {
        return Err(invalid(
            "install.accepted_extensions",
            &format!("'{bad}' must start with '.' and name a suffix"),
        ));
    }
    if install.max_entries == 0 {
        return Err(invalid("install.max_entries", "must be greater than zero"));
    }
    if install.max_extracted_bytes == 0 {
        return Err(invalid(
            "install.max_extracted_bytes",
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(invalid(
            "logging.level",
            &format!(
                "unknown level '{}'; expected one of: {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }
    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            &format!(
                "unknown format '{}'; expected one of: {}",
                config.logging.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }
    if !LOG_TARGETS.contains(&config.logging.target.as_str()) {
        return Err(invalid(
            "logging.target",
            &format!(
                "unknown target '{}'; expected one of: {}",
                config.logging.target,
                LOG_TARGETS.join(", ")
            ),
        ));
    }
    if config.logging.target == "file" && config.logging.directory.as_os_str().is_empty() {
        return Err(invalid(
            "logging.directory",
            "a directory is required when logging to files",
        ));
    }
    Ok(())
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::ValidationError { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn empty_plugins_dir_rejected() {
        let mut config = Config::default();
        config.paths.plugins_dir = PathBuf::new();
        assert_eq!(field_of(validate(&config).unwrap_err()), "paths.plugins_dir");
    }

    #[test]
    fn shared_state_and_plugins_dir_rejected() {
        let mut config = Config::default();
        config.paths.state_dir = config.paths.plugins_dir.clone();
        assert_eq!(field_of(validate(&config).unwrap_err()), "paths.state_dir");
    }

    #[test]
    fn extension_without_dot_rejected() {
        let mut config = Config::default();
        config.install.accepted_extensions = vec!["tgz".into()];
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "install.accepted_extensions"
        );
    }

    #[test]
    fn zero_limits_rejected() {
        let mut config = Config::default();
        config.install.max_entries = 0;
        assert_eq!(field_of(validate(&config).unwrap_err()), "install.max_entries");
    }

    #[test]
    fn unknown_log_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "loud".into();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.level");
    }

    #[test]
    fn unknown_log_target_rejected() {
        let mut config = Config::default();
        config.logging.target = "syslog".into();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.target");
    }

    #[test]
    fn file_target_needs_a_directory() {
        let mut config = Config::default();
        config.logging.target = "file".into();
        assert!(validate(&config).is_ok());
        config.logging.directory = PathBuf::new();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.directory");
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let mut config = Config::default();
        config.logging.level = "DEBUG".into();
        assert!(validate(&config).is_ok());
    }
}
