//! SQLite backend implementation.
//!
//! This module implements [`ResourceStorage`](crate::core::ResourceStorage),
//! [`VersionedStorage`](crate::core::VersionedStorage) and
//! [`SearchProvider`](crate::core::SearchProvider) on SQLite. It supports
//! in-memory databases (tests, tooling) and file databases in WAL mode.
//!
//! # Example
//!
//! ```no_run
//! use clinical_persistence::backends::sqlite::SqliteBackend;
//! use clinical_persistence::core::ResourceStorage;
//! use clinical_persistence::types::ResourceType;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::in_memory()?;
//! backend.init_schema()?;
//!
//! let patient = backend
//!     .create(ResourceType::Patient, json!({"name": [{"family": "Smith"}]}))
//!     .await?;
//! assert_eq!(patient.version(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! -- Current version of every resource, deleted or not
//! CREATE TABLE resources (
//!     resource_type TEXT NOT NULL,
//!     id TEXT NOT NULL,
//!     version INTEGER NOT NULL,
//!     data BLOB NOT NULL,          -- JSON payload
//!     created_at TEXT NOT NULL,
//!     last_updated TEXT NOT NULL,
//!     is_deleted INTEGER NOT NULL DEFAULT 0,
//!     deleted_at TEXT,
//!     PRIMARY KEY (resource_type, id)
//! );
//!
//! -- Every accepted version
//! CREATE TABLE resource_history (
//!     resource_type TEXT NOT NULL,
//!     id TEXT NOT NULL,
//!     version INTEGER NOT NULL,
//!     data BLOB NOT NULL,
//!     last_updated TEXT NOT NULL,
//!     PRIMARY KEY (resource_type, id, version)
//! );
//! ```
//!
//! Each resource type also has an index table (`patient_index`,
//! `observation_index`, `diagnostic_report_index`, `service_request_index`)
//! plus `diagnostic_report_result` for ordered result references.

mod backend;
mod schema;
mod search;
mod search_impl;
mod storage;

pub use backend::{ID_PATTERN, SqliteBackend, SqliteBackendConfig};
pub use schema::SCHEMA_VERSION;
