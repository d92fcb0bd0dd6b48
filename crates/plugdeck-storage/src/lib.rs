//! Plugdeck Storage: keyed state persistence.
//!
//! The plugin registry keeps its canonical state as a handful of whole
//! records stored under well-known keys (`"plugins"`, `"active_plugins"`).
//! This crate provides the [`StateStore`] trait those records go through
//! and two implementations:
//!
//! - [`MemoryStateStore`]: in-process map, for tests and embedding
//! - [`FileStateStore`]: one JSON file per key, written atomically and
//!   guarded by an advisory lock so concurrent processes never observe a
//!   half-written record
//!
//! Values are opaque bytes at the trait level. The [`StateStoreExt`]
//! extension adds typed [`load_json`](StateStoreExt::load_json) /
//! [`save_json`](StateStoreExt::save_json) helpers on top.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod file;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use file::FileStateStore;
pub use store::{MemoryStateStore, StateStore, StateStoreExt};
