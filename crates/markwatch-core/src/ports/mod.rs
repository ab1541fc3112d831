//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the engine depends on,
//! but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ITreeProvider`] - Source of bookmark tree snapshots and live mutation events
//! - [`IStructuredStore`] - Small, synchronously-readable settings/state store
//! - [`IKeyValueStore`] - Large-capacity key-value cache for the bookmark snapshot

pub mod key_value_store;
pub mod structured_store;
pub mod tree_provider;
pub mod watch;

pub use key_value_store::IKeyValueStore;
pub use structured_store::{IStorageObserver, IStructuredStore, StorageChange, LOCAL_AREA};
pub use tree_provider::{ITreeObserver, ITreeProvider, TreeEvent};
pub use watch::WatchHandle;
