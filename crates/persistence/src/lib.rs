//! Clinical Resource Persistence Layer
//!
//! This crate stores Patient, Observation, DiagnosticReport and
//! ServiceRequest (order) resources as authoritative JSON payloads alongside
//! extracted, independently queryable index fields. It enforces the
//! version and soft-delete lifecycle, validates cross-resource references,
//! and serves filtered, paginated, link-navigable searchset bundles.
//!
//! # Backend Features
//!
//! - `sqlite` (default) - SQLite with in-memory and file (WAL) modes
//! - `admin` - the `clinical-store` administration binary
//!
//! # Architecture
//!
//! - [`types`] - Resource types, stored resources, index fields, queries and bundles
//! - [`search`] - Field extraction, reference validation and filter resolution
//! - [`core`] - Storage traits and the mutation clock
//! - [`backends`] - Backend implementations (SQLite)
//! - [`config`] - Store configuration (CLI and environment)
//! - [`error`] - Error types for all operations
//!
//! # Quick Start
//!
//! ```no_run
//! use clinical_persistence::backends::sqlite::SqliteBackend;
//! use clinical_persistence::core::{ResourceStorage, SearchProvider};
//! use clinical_persistence::types::{ResourceType, SearchBundle, SearchQuery};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::in_memory()?;
//! backend.init_schema()?;
//!
//! let patient = backend
//!     .create(
//!         ResourceType::Patient,
//!         json!({"id": "p1", "name": [{"family": "Smith", "given": ["Jane"]}]}),
//!     )
//!     .await?;
//! assert_eq!(patient.url(), "Patient/p1");
//!
//! backend
//!     .create(
//!         ResourceType::Observation,
//!         json!({
//!             "status": "final",
//!             "code": {"coding": [{"code": "2345-7"}]},
//!             "subject": {"reference": "Patient/p1"}
//!         }),
//!     )
//!     .await?;
//!
//! let query = SearchQuery::new(ResourceType::Observation).with_filter("patient", "p1");
//! let result = backend.search(&query).await?;
//! let bundle = SearchBundle::assemble(&result, &query, "http://localhost:8080");
//! assert_eq!(bundle.total, 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod core;
pub mod error;
pub mod search;
pub mod types;

// Re-export commonly used types at crate root
pub use config::StoreConfig;
pub use error::{ErrorKind, StorageError, StorageResult};
pub use types::{ResourceType, SearchBundle, SearchQuery, StoredResource};

// Re-export core traits
pub use core::{ResourceStorage, SearchProvider, SearchResult, VersionedStorage};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
