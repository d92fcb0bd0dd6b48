//! Bridge from `plugdeck_config::Config` to library types.

use plugdeck_config::{Config, ResolvedConfig};
use plugdeck_plugins::InstallOptions;
use plugdeck_telemetry::{LogConfig, LogFormat, LogTarget};

/// Prefix of daily log files under `logging.directory`.
const LOG_FILE_PREFIX: &str = "plugdeck";

/// Convert the logging section to a [`LogConfig`].
pub(crate) fn to_log_config(resolved: &ResolvedConfig) -> LogConfig {
    let cfg = &resolved.config;
    // Validation already rejected unknown formats and targets.
    let format = cfg.logging.format.parse().unwrap_or(LogFormat::Compact);

    let mut log_config = LogConfig::new(&cfg.logging.level).with_format(format);

    log_config = match cfg.logging.target.as_str() {
        "stdout" => log_config.with_target(LogTarget::Stdout),
        "file" => log_config.with_file_logging(resolved.log_dir(), LOG_FILE_PREFIX),
        _ => log_config.with_target(LogTarget::Stderr),
    };

    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }

    log_config
}

/// Convert the install section to [`InstallOptions`].
pub(crate) fn to_install_options(cfg: &Config) -> InstallOptions {
    InstallOptions {
        accepted_extensions: cfg.install.accepted_extensions.clone(),
        max_entries: cfg.install.max_entries,
        max_extracted_bytes: cfg.install.max_extracted_bytes,
    }
}
