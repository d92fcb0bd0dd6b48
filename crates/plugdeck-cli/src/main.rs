//! Plugdeck CLI - plugin registry administration
//!
//! Every command loads the layered configuration, builds a
//! [`PluginManager`](plugdeck_plugins::PluginManager) over the configured
//! directories and prints the result as text or JSON.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use plugdeck_config::{Config, ResolvedConfig};
use plugdeck_plugins::PluginManager;
use plugdeck_telemetry::{LogConfig, RequestContext, RequestGuard};

mod commands;
mod config_bridge;
mod theme;

use commands::{config, install, plugins};

/// Plugdeck - plugin registry and lifecycle manager
#[derive(Parser)]
#[command(name = "plugdeck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to an explicit configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Colored text for terminals.
    Pretty,
    /// One JSON document on stdout.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered plugins
    List {
        /// Only show active or inactive plugins
        #[arg(long)]
        status: Option<String>,
    },

    /// Enable plugins
    Activate {
        /// Plugin slugs
        #[arg(required = true)]
        slugs: Vec<String>,
    },

    /// Disable plugins
    Deactivate {
        /// Plugin slugs
        #[arg(required = true)]
        slugs: Vec<String>,
    },

    /// Delete disabled plugins from disk
    Delete {
        /// Plugin slugs
        #[arg(required = true)]
        slugs: Vec<String>,
    },

    /// Apply a bulk action (`activate-selected`, `deactivate-selected`, `delete-selected`)
    Bulk {
        /// Action name
        action: String,
        /// Plugin slugs
        slugs: Vec<String>,
    },

    /// Show the settings page of an active plugin
    Settings {
        /// Plugin slug
        slug: String,
    },

    /// Install plugins from a `.tar.gz` archive
    Install {
        /// Path to the archive
        archive: PathBuf,
    },

    /// Show plugin totals
    Counts,

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show resolved configuration with source annotations
    Show,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(cli.config.as_deref());

    // Set up logging from config, with --verbose override.
    let logging = match &loaded {
        Ok(resolved) => {
            let mut lc = config_bridge::to_log_config(resolved);
            if cli.verbose {
                "debug".clone_into(&mut lc.level);
            }
            plugdeck_telemetry::setup_logging(&lc)
        },
        // Fallback if config loading fails.
        Err(_) if cli.verbose => plugdeck_telemetry::setup_logging(&LogConfig::new("debug")),
        Err(_) => plugdeck_telemetry::setup_default_logging(),
    };
    if let Err(e) = logging {
        eprintln!("Failed to initialize logging: {e}");
    }

    let resolved = loaded.context("failed to load configuration")?;
    let _request = RequestGuard::new(
        RequestContext::new("cli").with_operation(cli.command.operation()),
    );

    let manager = open_manager(&resolved);
    let format = cli.format;
    match cli.command {
        Commands::List { status } => plugins::list_plugins(&manager, status.as_deref(), format),
        Commands::Activate { slugs } => plugins::run_bulk(&manager, "activate", &slugs, format),
        Commands::Deactivate { slugs } => {
            plugins::run_bulk(&manager, "deactivate", &slugs, format)
        },
        Commands::Delete { slugs } => plugins::run_bulk(&manager, "delete", &slugs, format),
        Commands::Bulk { action, slugs } => plugins::run_bulk(&manager, &action, &slugs, format),
        Commands::Settings { slug } => plugins::show_settings(&manager, &slug, format),
        Commands::Install { archive } => install::install_archive(&manager, &archive, format),
        Commands::Counts => plugins::show_counts(&manager, format),
        Commands::Config { command } => match command {
            ConfigCommands::Show => config::show_config(&resolved, format),
        },
    }
}

impl Commands {
    fn operation(&self) -> &'static str {
        match self {
            Self::List { .. } => "list",
            Self::Activate { .. } => "activate",
            Self::Deactivate { .. } => "deactivate",
            Self::Delete { .. } => "delete",
            Self::Bulk { .. } => "bulk",
            Self::Settings { .. } => "settings",
            Self::Install { .. } => "install",
            Self::Counts => "counts",
            Self::Config { .. } => "config",
        }
    }
}

fn open_manager(resolved: &ResolvedConfig) -> PluginManager {
    PluginManager::open(
        resolved.plugins_dir(),
        resolved.uploads_dir(),
        resolved.state_dir(),
    )
    .with_install_options(config_bridge::to_install_options(&resolved.config))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "plugdeck", "activate", "seo", "gallery", "--format", "json", "-v",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Activate { ref slugs } if slugs.len() == 2));
    }

    #[test]
    fn activate_requires_a_slug() {
        assert!(Cli::try_parse_from(["plugdeck", "activate"]).is_err());
    }

    #[test]
    fn bulk_accepts_empty_selection() {
        let cli = Cli::try_parse_from(["plugdeck", "bulk", "delete-selected"]).unwrap();
        assert_eq!(cli.command.operation(), "bulk");
    }
}
