//! ResourceStorage and VersionedStorage implementations for SQLite.
//!
//! Every write opens a `BEGIN IMMEDIATE` transaction before its first read,
//! so existence and version checks, reference validation and the write
//! itself see one state and commit together. Any early return drops the
//! transaction, which rolls it back.

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use serde_json::Value;
use tracing::debug;

use crate::core::clock::{format_timestamp, parse_timestamp};
use crate::core::{ResourceStorage, VersionedStorage};
use crate::error::{
    ConcurrencyError, ResourceError, StorageError, StorageResult, ValidationError,
};
use crate::search::{
    ReferenceLookup, check_payload, extract, validate_references, validate_required,
};
use crate::types::{IndexFields, ResourceType, StoredResource};

use super::SqliteBackend;
use super::search::{PAGE_COLUMNS, write_index};

/// A `resources` row as selected by [`PAGE_COLUMNS`].
pub(super) struct RecordRow {
    id: String,
    version: u64,
    data: Vec<u8>,
    created_at: String,
    last_updated: String,
}

impl RecordRow {
    pub(super) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            version: row.get::<_, i64>(1)? as u64,
            data: row.get(2)?,
            created_at: row.get(3)?,
            last_updated: row.get(4)?,
        })
    }

    /// Materializes the row as a live resource.
    pub(super) fn into_resource(self, resource_type: ResourceType) -> StorageResult<StoredResource> {
        let content: Value = serde_json::from_slice(&self.data)?;
        let index = extract(resource_type, &content);
        Ok(StoredResource::from_storage(
            resource_type,
            self.id,
            self.version,
            content,
            index,
            parse_timestamp(&self.created_at)?,
            parse_timestamp(&self.last_updated)?,
            false,
        ))
    }
}

impl ReferenceLookup for Connection {
    fn is_live(&self, resource_type: ResourceType, id: &str) -> StorageResult<bool> {
        Ok(self
            .query_row(
                "SELECT 1 FROM resources WHERE resource_type = ?1 AND id = ?2 AND is_deleted = 0",
                params![resource_type.as_str(), id],
                |_| Ok(()),
            )
            .optional()?
            .is_some())
    }
}

fn load_live(conn: &Connection, resource_type: ResourceType, id: &str) -> StorageResult<Option<RecordRow>> {
    let sql = format!(
        "SELECT {} FROM resources r WHERE r.resource_type = ?1 AND r.id = ?2 AND r.is_deleted = 0",
        PAGE_COLUMNS
    );
    Ok(conn
        .query_row(&sql, params![resource_type.as_str(), id], RecordRow::from_row)
        .optional()?)
}

/// Whether the id was ever used for the type, deleted or not.
fn id_used(conn: &Connection, resource_type: ResourceType, id: &str) -> StorageResult<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM resources WHERE resource_type = ?1 AND id = ?2",
            params![resource_type.as_str(), id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

fn insert_history(conn: &Connection, stored: &StoredResource, data: &[u8]) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO resource_history (resource_type, id, version, data, last_updated)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            stored.resource_type().as_str(),
            stored.id(),
            stored.version() as i64,
            data,
            format_timestamp(stored.last_updated())
        ],
    )?;
    Ok(())
}

/// Payload checks that need no database access.
fn prepare_write(resource_type: ResourceType, resource: &Value) -> StorageResult<IndexFields> {
    check_payload(resource_type, resource)?;
    let fields = extract(resource_type, resource);
    validate_required(&fields)?;
    Ok(fields)
}

fn invalid_id(value: &Value) -> StorageError {
    let id = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    ValidationError::InvalidId { id }.into()
}

impl SqliteBackend {
    /// The client-supplied id of a create payload, if any.
    fn payload_id(&self, resource: &Value) -> StorageResult<Option<String>> {
        match resource.get("id") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(id)) if self.is_valid_id(id) => Ok(Some(id.clone())),
            Some(other) => Err(invalid_id(other)),
        }
    }

    fn update_inner(
        &self,
        resource_type: ResourceType,
        id: &str,
        expected_version: Option<u64>,
        resource: Value,
    ) -> StorageResult<StoredResource> {
        match resource.get("id") {
            None | Some(Value::Null) => {}
            Some(Value::String(payload_id)) if payload_id == id => {}
            Some(Value::String(payload_id)) => {
                return Err(ResourceError::IdMismatch {
                    resource_type: resource_type.to_string(),
                    target_id: id.to_string(),
                    payload_id: payload_id.clone(),
                }
                .into());
            }
            Some(other) => return Err(invalid_id(other)),
        }
        let fields = prepare_write(resource_type, &resource)?;

        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = load_live(&tx, resource_type, id)?
            .ok_or_else(|| StorageError::not_found(resource_type.as_str(), id))?;

        if let Some(expected) = expected_version {
            if current.version != expected {
                return Err(ConcurrencyError::VersionConflict {
                    resource_type: resource_type.to_string(),
                    id: id.to_string(),
                    expected_version: expected,
                    actual_version: current.version,
                }
                .into());
            }
        }

        validate_references(&*tx, &fields)?;

        let created_at = parse_timestamp(&current.created_at)?;
        let now = self.clock().now_after(parse_timestamp(&current.last_updated)?);
        let version = current.version + 1;

        let stored = StoredResource::from_storage(
            resource_type,
            id,
            version,
            resource,
            fields,
            created_at,
            now,
            false,
        );
        let data = serde_json::to_vec(stored.content())?;

        tx.execute(
            "UPDATE resources SET version = ?3, data = ?4, last_updated = ?5
             WHERE resource_type = ?1 AND id = ?2",
            params![
                resource_type.as_str(),
                id,
                version as i64,
                data,
                format_timestamp(now)
            ],
        )?;
        insert_history(&tx, &stored, &data)?;
        write_index(&tx, id, stored.index())?;
        tx.commit()?;

        debug!(resource_type = %resource_type, id, version, "Updated resource");
        Ok(stored)
    }
}

#[async_trait]
impl ResourceStorage for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn create(
        &self,
        resource_type: ResourceType,
        resource: Value,
    ) -> StorageResult<StoredResource> {
        let fields = prepare_write(resource_type, &resource)?;
        let client_id = self.payload_id(&resource)?;

        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let id = match client_id {
            Some(id) => {
                if id_used(&tx, resource_type, &id)? {
                    return Err(ResourceError::AlreadyExists {
                        resource_type: resource_type.to_string(),
                        id,
                    }
                    .into());
                }
                id
            }
            None => loop {
                let candidate = uuid::Uuid::new_v4().to_string();
                if !id_used(&tx, resource_type, &candidate)? {
                    break candidate;
                }
            },
        };

        validate_references(&*tx, &fields)?;

        let now = self.clock().now();
        let stored =
            StoredResource::from_storage(resource_type, &id, 1, resource, fields, now, now, false);
        let data = serde_json::to_vec(stored.content())?;
        let timestamp = format_timestamp(now);

        tx.execute(
            "INSERT INTO resources (resource_type, id, version, data, created_at, last_updated, is_deleted)
             VALUES (?1, ?2, 1, ?3, ?4, ?4, 0)",
            params![resource_type.as_str(), id, data, timestamp],
        )?;
        insert_history(&tx, &stored, &data)?;
        write_index(&tx, &id, stored.index())?;
        tx.commit()?;

        debug!(resource_type = %resource_type, id = %id, "Created resource");
        Ok(stored)
    }

    async fn read(&self, resource_type: ResourceType, id: &str) -> StorageResult<StoredResource> {
        let conn = self.get_connection()?;
        load_live(&conn, resource_type, id)?
            .ok_or_else(|| StorageError::not_found(resource_type.as_str(), id))?
            .into_resource(resource_type)
    }

    async fn update(
        &self,
        resource_type: ResourceType,
        id: &str,
        resource: Value,
    ) -> StorageResult<StoredResource> {
        self.update_inner(resource_type, id, None, resource)
    }

    async fn delete(&self, resource_type: ResourceType, id: &str) -> StorageResult<()> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = load_live(&tx, resource_type, id)?
            .ok_or_else(|| StorageError::not_found(resource_type.as_str(), id))?;
        let now = format_timestamp(
            self.clock()
                .now_after(parse_timestamp(&current.last_updated)?),
        );

        tx.execute(
            "UPDATE resources SET is_deleted = 1, deleted_at = ?3, last_updated = ?3
             WHERE resource_type = ?1 AND id = ?2",
            params![resource_type.as_str(), id, now],
        )?;
        tx.commit()?;

        debug!(resource_type = %resource_type, id, "Deleted resource");
        Ok(())
    }

    async fn exists(&self, resource_type: ResourceType, id: &str) -> StorageResult<bool> {
        let conn = self.get_connection()?;
        conn.is_live(resource_type, id)
    }

    async fn count(&self, resource_type: ResourceType) -> StorageResult<u64> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM resources WHERE resource_type = ?1 AND is_deleted = 0",
            [resource_type.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[async_trait]
impl VersionedStorage for SqliteBackend {
    async fn vread(
        &self,
        resource_type: ResourceType,
        id: &str,
        version: u64,
    ) -> StorageResult<StoredResource> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        let current = load_live(&tx, resource_type, id)?
            .ok_or_else(|| StorageError::not_found(resource_type.as_str(), id))?;

        let row = tx
            .query_row(
                "SELECT id, version, data, ?3, last_updated FROM resource_history
                 WHERE resource_type = ?1 AND id = ?2 AND version = ?4",
                params![resource_type.as_str(), id, current.created_at, version as i64],
                RecordRow::from_row,
            )
            .optional()?
            .ok_or_else(|| {
                StorageError::not_found(resource_type.as_str(), format!("{id}/_history/{version}"))
            })?;

        row.into_resource(resource_type)
    }

    async fn update_if_version(
        &self,
        resource_type: ResourceType,
        id: &str,
        expected_version: u64,
        resource: Value,
    ) -> StorageResult<StoredResource> {
        self.update_inner(resource_type, id, Some(expected_version), resource)
    }

    async fn list_versions(&self, resource_type: ResourceType, id: &str) -> StorageResult<Vec<u64>> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        if !tx.is_live(resource_type, id)? {
            return Err(StorageError::not_found(resource_type.as_str(), id));
        }

        let mut stmt = tx.prepare(
            "SELECT version FROM resource_history
             WHERE resource_type = ?1 AND id = ?2 ORDER BY version",
        )?;
        let versions = stmt
            .query_map(params![resource_type.as_str(), id], |row| row.get::<_, i64>(0))?
            .map(|v| v.map(|v| v as u64))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(versions)
    }
}
