//! Core resource storage trait.
//!
//! This module defines the [`ResourceStorage`] trait, which provides the
//! per-type CRUD operations of the store.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageResult;
use crate::types::{ResourceType, StoredResource};

/// Core storage trait for clinical resources.
///
/// Every operation is a method on an explicit store value; there is no
/// ambient store.
///
/// # Write pipeline
///
/// Create and update run extraction, required-field checks, reference
/// validation and the write as one atomic unit. A failed operation leaves
/// the store exactly as it was.
///
/// # Versioning
///
/// Create assigns version 1 and each successful update adds exactly 1.
/// Versions are never client-supplied; any `meta.versionId` in a payload is
/// ignored and rewritten.
///
/// # Soft Deletes
///
/// `delete` flips the record's deletion flag. The payload, index rows and
/// version are retained, the id stays retired, and the record no longer
/// appears in reads or searches.
///
/// # Example
///
/// ```ignore
/// use clinical_persistence::core::ResourceStorage;
/// use clinical_persistence::types::ResourceType;
///
/// async fn example<S: ResourceStorage>(storage: &S) -> StorageResult<()> {
///     let patient = serde_json::json!({
///         "resourceType": "Patient",
///         "name": [{"family": "Smith"}]
///     });
///     let stored = storage.create(ResourceType::Patient, patient).await?;
///     println!("Created: {}", stored.url());
///
///     let read = storage.read(ResourceType::Patient, stored.id()).await?;
///     assert_eq!(read.version(), 1);
///
///     storage.delete(ResourceType::Patient, stored.id()).await?;
///     assert!(!storage.exists(ResourceType::Patient, stored.id()).await?);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ResourceStorage: Send + Sync {
    /// Returns a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;

    /// Creates a new resource.
    ///
    /// The id is taken from the payload when present, otherwise a fresh
    /// UUID is assigned.
    ///
    /// # Errors
    ///
    /// * `ValidationError::InvalidResource` - payload is not an object or names another type
    /// * `ValidationError::InvalidId` - payload id is not a valid id
    /// * `ValidationError::MissingRequiredField` - a required field is absent
    /// * `ValidationError::MalformedReference` - a `result[i]` entry has no usable reference
    /// * `ReferenceError::*` - a reference is unresolved or mistyped
    /// * `ResourceError::AlreadyExists` - the id has ever been used for this type
    async fn create(
        &self,
        resource_type: ResourceType,
        resource: Value,
    ) -> StorageResult<StoredResource>;

    /// Reads the live resource with the given id.
    ///
    /// # Errors
    ///
    /// * `ResourceError::NotFound` - unknown or soft-deleted id
    async fn read(&self, resource_type: ResourceType, id: &str) -> StorageResult<StoredResource>;

    /// Replaces a live resource, bumping its version by one.
    ///
    /// # Errors
    ///
    /// * `ResourceError::NotFound` - unknown or soft-deleted id
    /// * `ResourceError::IdMismatch` - the payload carries a different id
    /// * the validation and reference errors of [`ResourceStorage::create`]
    async fn update(
        &self,
        resource_type: ResourceType,
        id: &str,
        resource: Value,
    ) -> StorageResult<StoredResource>;

    /// Soft-deletes a live resource.
    ///
    /// Deleting an already deleted resource is `NotFound`.
    async fn delete(&self, resource_type: ResourceType, id: &str) -> StorageResult<()>;

    /// Returns `true` if a live resource with the id exists.
    async fn exists(&self, resource_type: ResourceType, id: &str) -> StorageResult<bool>;

    /// Counts live resources of a type.
    async fn count(&self, resource_type: ResourceType) -> StorageResult<u64>;
}
