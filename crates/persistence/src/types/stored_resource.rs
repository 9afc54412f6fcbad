//! Stored resource types.
//!
//! This module defines the [`StoredResource`] type, which wraps a clinical
//! resource payload with its extracted index fields and persistence
//! metadata (version, timestamps, deletion flag).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::clock::format_timestamp;

use super::{IndexFields, ResourceType};

/// A clinical resource with persistence metadata.
///
/// `StoredResource` is the one shape shared by every resource type:
///
/// - **Identity**: resource type and logical id
/// - **Content**: the canonical payload, as accepted at write time
/// - **Index**: the typed [`IndexFields`] view produced by the extractor
/// - **Versioning**: a version counter starting at 1
/// - **Lifecycle**: creation and last-update timestamps plus the soft-delete flag
///
/// Instances are only built by the store. When a record is materialized,
/// the payload's `id`, `resourceType`, `meta.versionId` and
/// `meta.lastUpdated` are overwritten from the record, so the payload can
/// never disagree with its metadata.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use clinical_persistence::search::extract;
/// use clinical_persistence::types::{ResourceType, StoredResource};
/// use serde_json::json;
///
/// let content = json!({"resourceType": "Patient", "name": [{"family": "Smith"}]});
/// let index = extract(ResourceType::Patient, &content);
/// let now = Utc::now();
///
/// let resource = StoredResource::from_storage(
///     ResourceType::Patient, "p1", 1, content, index, now, now, false,
/// );
///
/// assert_eq!(resource.url(), "Patient/p1");
/// assert_eq!(resource.content()["id"], "p1");
/// assert_eq!(resource.content()["meta"]["versionId"], "1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResource {
    resource_type: ResourceType,
    id: String,
    version: u64,
    content: Value,
    index: IndexFields,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    is_deleted: bool,
}

impl StoredResource {
    /// Builds a stored resource from persisted data.
    ///
    /// The payload's identity and meta fields are rewritten from the
    /// supplied record values.
    #[allow(clippy::too_many_arguments)]
    pub fn from_storage(
        resource_type: ResourceType,
        id: impl Into<String>,
        version: u64,
        mut content: Value,
        index: IndexFields,
        created_at: DateTime<Utc>,
        last_updated: DateTime<Utc>,
        is_deleted: bool,
    ) -> Self {
        let id = id.into();
        stamp_meta(&mut content, resource_type, &id, version, last_updated);

        Self {
            resource_type,
            id,
            version,
            content,
            index,
            created_at,
            last_updated,
            is_deleted,
        }
    }

    /// Returns the resource type.
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Returns the resource's logical ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the version number.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the version as it appears in `meta.versionId`.
    pub fn version_id(&self) -> String {
        self.version.to_string()
    }

    /// Returns the payload.
    pub fn content(&self) -> &Value {
        &self.content
    }

    /// Consumes self and returns the payload.
    pub fn into_content(self) -> Value {
        self.content
    }

    /// Returns the extracted index fields.
    pub fn index(&self) -> &IndexFields {
        &self.index
    }

    /// Returns when the resource was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the resource was last written or deleted.
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Returns `true` if the resource has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    /// Returns the relative URL of this resource (e.g., "Patient/123").
    pub fn url(&self) -> String {
        format!("{}/{}", self.resource_type, self.id)
    }

    /// Returns the versioned URL path (e.g., "Patient/123/_history/1").
    pub fn versioned_url(&self) -> String {
        format!("{}/{}/_history/{}", self.resource_type, self.id, self.version)
    }
}

fn stamp_meta(
    content: &mut Value,
    resource_type: ResourceType,
    id: &str,
    version: u64,
    last_updated: DateTime<Utc>,
) {
    let Some(obj) = content.as_object_mut() else {
        return;
    };

    obj.insert(
        "resourceType".to_string(),
        Value::String(resource_type.as_str().to_string()),
    );
    obj.insert("id".to_string(), Value::String(id.to_string()));

    let meta = obj
        .entry("meta")
        .or_insert_with(|| Value::Object(Map::new()));
    if !meta.is_object() {
        *meta = Value::Object(Map::new());
    }
    if let Some(meta) = meta.as_object_mut() {
        meta.insert("versionId".to_string(), Value::String(version.to_string()));
        meta.insert(
            "lastUpdated".to_string(),
            Value::String(format_timestamp(last_updated)),
        );
    }
}
