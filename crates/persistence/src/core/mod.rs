//! Core storage traits and abstractions.
//!
//! This module provides the foundational traits for the persistence layer:
//!
//! - [`ResourceStorage`] - Core CRUD operations
//! - [`VersionedStorage`] - Version history and compare-and-swap updates
//! - [`SearchProvider`] - Filtered, paged search
//! - [`MonotonicClock`] - Timestamps for every mutation
//!
//! # Trait Hierarchy
//!
//! ```text
//! ResourceStorage
//!     ├── VersionedStorage
//!     └── SearchProvider
//! ```
//!
//! The SQLite backend implements all three.

pub mod clock;
mod search;
mod storage;
mod versioned;

pub use clock::MonotonicClock;
pub use search::{SearchProvider, SearchResult};
pub use storage::ResourceStorage;
pub use versioned::VersionedStorage;
