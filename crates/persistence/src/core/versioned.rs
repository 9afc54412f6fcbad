//! Version-aware storage operations.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageResult;
use crate::types::{ResourceType, StoredResource};

use super::storage::ResourceStorage;

/// Storage that exposes version history and compare-and-swap updates.
///
/// Every create and update appends the accepted payload to the history.
/// Soft deletion hides the whole history along with the current record.
///
/// # Example
///
/// ```ignore
/// use clinical_persistence::core::VersionedStorage;
///
/// async fn example<S: VersionedStorage>(storage: &S) -> StorageResult<()> {
///     let current = storage.read(ResourceType::Patient, "p1").await?;
///     let updated = storage
///         .update_if_version(ResourceType::Patient, "p1", current.version(), payload)
///         .await?;
///     let first = storage.vread(ResourceType::Patient, "p1", 1).await?;
///     assert_eq!(storage.list_versions(ResourceType::Patient, "p1").await?, vec![1, 2]);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait VersionedStorage: ResourceStorage {
    /// Reads a specific version of a live resource.
    ///
    /// # Errors
    ///
    /// * `ResourceError::NotFound` - unknown or deleted id, or unknown version
    async fn vread(
        &self,
        resource_type: ResourceType,
        id: &str,
        version: u64,
    ) -> StorageResult<StoredResource>;

    /// Updates a resource only if its current version is `expected_version`.
    ///
    /// The version check and the write happen in the same transaction.
    ///
    /// # Errors
    ///
    /// * `ConcurrencyError::VersionConflict` - the current version differs
    /// * every error of [`ResourceStorage::update`]
    async fn update_if_version(
        &self,
        resource_type: ResourceType,
        id: &str,
        expected_version: u64,
        resource: Value,
    ) -> StorageResult<StoredResource>;

    /// Returns the current version of a live resource.
    async fn current_version(&self, resource_type: ResourceType, id: &str) -> StorageResult<u64> {
        Ok(self.read(resource_type, id).await?.version())
    }

    /// Lists the versions of a live resource, oldest first.
    async fn list_versions(&self, resource_type: ResourceType, id: &str) -> StorageResult<Vec<u64>>;
}
