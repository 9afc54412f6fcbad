//! SQLite schema definitions.
//!
//! Payloads live in `resources` (current version) and `resource_history`
//! (every accepted version). Each resource type has one index table keyed
//! by resource id; DiagnosticReport result references get their own table
//! to preserve order.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{BackendError, StorageError, StorageResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

const TABLES: &[(&str, &str)] = &[
    (
        "resources",
        "CREATE TABLE IF NOT EXISTS resources (
            resource_type TEXT NOT NULL,
            id TEXT NOT NULL,
            version INTEGER NOT NULL,
            data BLOB NOT NULL,
            created_at TEXT NOT NULL,
            last_updated TEXT NOT NULL,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            deleted_at TEXT,
            PRIMARY KEY (resource_type, id)
        )",
    ),
    (
        "resource_history",
        "CREATE TABLE IF NOT EXISTS resource_history (
            resource_type TEXT NOT NULL,
            id TEXT NOT NULL,
            version INTEGER NOT NULL,
            data BLOB NOT NULL,
            last_updated TEXT NOT NULL,
            PRIMARY KEY (resource_type, id, version)
        )",
    ),
    (
        "patient_index",
        "CREATE TABLE IF NOT EXISTS patient_index (
            id TEXT PRIMARY KEY,
            family TEXT, -- lowercased
            given TEXT,  -- lowercased
            identifier TEXT,
            birth_date TEXT,
            gender TEXT
        )",
    ),
    (
        "observation_index",
        "CREATE TABLE IF NOT EXISTS observation_index (
            id TEXT PRIMARY KEY,
            code TEXT,
            code_display TEXT,
            status TEXT,
            category TEXT,
            effective TEXT,
            value_quantity REAL,
            value_unit TEXT,
            value_code TEXT,
            subject TEXT
        )",
    ),
    (
        "diagnostic_report_index",
        "CREATE TABLE IF NOT EXISTS diagnostic_report_index (
            id TEXT PRIMARY KEY,
            code TEXT,
            code_display TEXT,
            status TEXT,
            category TEXT,
            effective TEXT,
            issued TEXT,
            conclusion TEXT,
            subject TEXT
        )",
    ),
    (
        "diagnostic_report_result",
        "CREATE TABLE IF NOT EXISTS diagnostic_report_result (
            report_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            observation_id TEXT NOT NULL,
            PRIMARY KEY (report_id, position)
        )",
    ),
    (
        "service_request_index",
        "CREATE TABLE IF NOT EXISTS service_request_index (
            id TEXT PRIMARY KEY,
            code TEXT,
            status TEXT,
            intent TEXT,
            category TEXT,
            priority TEXT,
            authored TEXT,
            occurrence TEXT,
            requester TEXT,
            performer TEXT,
            subject TEXT
        )",
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_resources_order ON resources(resource_type, is_deleted, last_updated, id)",
    "CREATE INDEX IF NOT EXISTS idx_patient_identifier ON patient_index(identifier)",
    "CREATE INDEX IF NOT EXISTS idx_observation_subject ON observation_index(subject)",
    "CREATE INDEX IF NOT EXISTS idx_observation_code ON observation_index(code)",
    "CREATE INDEX IF NOT EXISTS idx_report_subject ON diagnostic_report_index(subject)",
    "CREATE INDEX IF NOT EXISTS idx_report_result_observation ON diagnostic_report_result(observation_id)",
    "CREATE INDEX IF NOT EXISTS idx_service_request_subject ON service_request_index(subject)",
];

fn migration_error(what: &str, e: rusqlite::Error) -> StorageError {
    StorageError::Backend(BackendError::MigrationError {
        message: format!("{what}: {e}"),
    })
}

/// Initialize the database schema.
///
/// Idempotent. A database written by a newer schema is refused.
pub fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version > SCHEMA_VERSION {
        return Err(StorageError::Backend(BackendError::MigrationError {
            message: format!(
                "database schema version {current_version} is newer than supported version {SCHEMA_VERSION}"
            ),
        }));
    }

    if current_version == SCHEMA_VERSION {
        return Ok(());
    }

    for (name, sql) in TABLES {
        conn.execute(sql, [])
            .map_err(|e| migration_error(&format!("Failed to create {name} table"), e))?;
    }
    for sql in INDEXES {
        conn.execute(sql, [])
            .map_err(|e| migration_error("Failed to create index", e))?;
    }
    set_schema_version(conn, SCHEMA_VERSION)?;

    info!(version = SCHEMA_VERSION, "Initialized SQLite schema");
    Ok(())
}

/// Get the current schema version (0 for a fresh database).
pub fn get_schema_version(conn: &Connection) -> StorageResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| migration_error("Failed to create schema_version table", e))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> StorageResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| migration_error("Failed to clear schema_version", e))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| migration_error("Failed to set schema_version", e))?;
    Ok(())
}
