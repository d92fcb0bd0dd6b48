//! Plugdeck Telemetry - logging and request tracing.
//!
//! This crate provides:
//! - [`setup_logging`]: a global subscriber with pretty, compact, JSON or
//!   full rendering, written to stdout, stderr or daily-rotated files
//! - [`RequestContext`] / [`RequestGuard`] for wrapping one admin request
//!   (list, activate, install, ...) in a correlated span
//!
//! # Example
//!
//! ```rust,no_run
//! use plugdeck_telemetry::{LogConfig, LogFormat, RequestGuard, RequestContext, setup_logging};
//!
//! # fn main() -> Result<(), plugdeck_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("plugdeck_storage=trace");
//!
//! setup_logging(&config)?;
//!
//! let _guard = RequestGuard::new(RequestContext::new("cli").with_operation("list"));
//! tracing::info!("Listing plugins");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod context;
mod error;
mod logging;

pub use context::{RequestContext, RequestGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
