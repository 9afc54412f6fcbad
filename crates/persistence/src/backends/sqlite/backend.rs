//! SQLite backend implementation.

use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::MonotonicClock;
use crate::error::{BackendError, StorageError, StorageResult};

use super::schema;

/// Pattern every logical resource id must match.
pub const ID_PATTERN: &str = r"^[A-Za-z0-9\-.]{1,64}$";

/// SQLite backend for clinical resource storage.
pub struct SqliteBackend {
    pool: Pool<SqliteConnectionManager>,
    config: SqliteBackendConfig,
    is_memory: bool,
    clock: MonotonicClock,
    id_pattern: Regex,
}

impl Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("config", &self.config)
            .field("is_memory", &self.is_memory)
            .finish_non_exhaustive()
    }
}

/// Configuration for the SQLite backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteBackendConfig {
    /// Maximum number of connections in the pool (file databases only).
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of idle connections.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,

    /// Enable WAL mode for file databases.
    #[serde(default = "default_true")]
    pub enable_wal: bool,

    /// Upper bound on a single search, in milliseconds.
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_search_timeout_ms() -> u64 {
    30000
}

impl Default for SqliteBackendConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_wal: true,
            search_timeout_ms: default_search_timeout_ms(),
        }
    }
}

impl SqliteBackend {
    /// Creates a new in-memory SQLite backend.
    pub fn in_memory() -> StorageResult<Self> {
        Self::with_config(":memory:", SqliteBackendConfig::default())
    }

    /// Opens or creates a file-based SQLite database.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        Self::with_config(path, SqliteBackendConfig::default())
    }

    /// Creates a backend with custom configuration.
    ///
    /// An in-memory database lives inside one connection, so its pool holds
    /// exactly one connection that is never recycled.
    pub fn with_config<P: AsRef<Path>>(
        path: P,
        config: SqliteBackendConfig,
    ) -> StorageResult<Self> {
        let is_memory = path.as_ref().to_string_lossy() == ":memory:";

        let busy_timeout = Duration::from_millis(u64::from(config.busy_timeout_ms));
        let wal = config.enable_wal && !is_memory;
        let manager = if is_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path.as_ref())
        }
        .with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            if wal {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
            }
            Ok(())
        });

        let builder = Pool::builder()
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms));
        let builder = if is_memory {
            builder
                .max_size(1)
                .min_idle(Some(1))
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            builder
                .max_size(config.max_connections)
                .min_idle(Some(config.min_connections))
        };

        let pool = builder.build(manager).map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: "sqlite".to_string(),
                message: e.to_string(),
            })
        })?;

        let id_pattern = Regex::new(ID_PATTERN).map_err(|e| {
            StorageError::Backend(BackendError::Internal {
                backend_name: "sqlite".to_string(),
                message: format!("Invalid id pattern: {}", e),
                source: None,
            })
        })?;

        debug!(
            path = %path.as_ref().display(),
            is_memory,
            "Opened SQLite backend"
        );

        Ok(Self {
            pool,
            config,
            is_memory,
            clock: MonotonicClock::new(),
            id_pattern,
        })
    }

    /// Initialize the database schema.
    pub fn init_schema(&self) -> StorageResult<()> {
        let conn = self.get_connection()?;
        schema::initialize_schema(&conn)
    }

    /// Returns the schema version recorded in the database (0 if uninitialized).
    pub fn schema_version(&self) -> StorageResult<i32> {
        let conn = self.get_connection()?;
        schema::get_schema_version(&conn)
    }

    /// Get a connection from the pool.
    pub(crate) fn get_connection(
        &self,
    ) -> StorageResult<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: "sqlite".to_string(),
                message: e.to_string(),
            })
        })
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &SqliteBackendConfig {
        &self.config
    }

    pub(crate) fn clock(&self) -> &MonotonicClock {
        &self.clock
    }

    /// Returns `true` if `id` is a well-formed logical id.
    pub fn is_valid_id(&self, id: &str) -> bool {
        self.id_pattern.is_match(id)
    }
}
