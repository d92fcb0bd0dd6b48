#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for plugdeck.
//!
//! # Usage
//!
//! ```rust,no_run
//! use plugdeck_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("plugins live in {}", resolved.plugins_dir().display());
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Explicit file** (`--config <path>`)
//! 2. **User** (`<data root>/config.toml`)
//! 3. **Environment variables** (`PLUGDECK_*`), fallback only: applied to
//!    fields no file set
//! 4. **Embedded defaults** (`defaults.toml` compiled into binary)
//!
//! The data root is `$PLUGDECK_HOME` when set, otherwise `~/.plugdeck`.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging with source tracking.
pub mod merge;
/// Source-annotated display.
pub mod show;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use show::{ResolvedConfig, ShowFormat};
pub use merge::{ConfigLayer, FieldSources};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// See [`loader::load`] for the algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, None)
    }
}
