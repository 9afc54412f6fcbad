//! Database backend implementations.
//!
//! Each backend implements the storage traits from [`crate::core`] and is
//! gated behind a feature flag.
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | SQLite | `sqlite` | Embedded database, in-memory or file (WAL) |

#[cfg(feature = "sqlite")]
pub mod sqlite;
