//! markwatch Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `BookmarkRecord`, `TreeNode`, `ChangeRecord`
//! - **Pure algorithms** - tree flattening and identity-keyed diffing
//! - **Port definitions** - Traits for adapters: `ITreeProvider`,
//!   `IStructuredStore`, `IKeyValueStore`
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O. Ports define
//! trait interfaces that adapter crates (`markwatch-cache`, `markwatch-sync`)
//! implement, and the engine in `markwatch-sync` orchestrates both.

pub mod config;
pub mod domain;
pub mod ports;
