//! Assertion helpers for storage results.

#![allow(dead_code)]

use clinical_persistence::error::{ErrorKind, StorageResult};
use clinical_persistence::types::StoredResource;

/// Asserts that `result` failed with `kind`, returning the error's field.
pub fn assert_error_kind<T: std::fmt::Debug>(
    result: StorageResult<T>,
    kind: ErrorKind,
) -> Option<String> {
    match result {
        Ok(value) => panic!("Expected {kind} error, got Ok({value:?})"),
        Err(err) => {
            assert_eq!(err.kind(), kind, "Unexpected error: {err}");
            err.field().map(String::from)
        }
    }
}

/// Asserts that a stored resource carries the expected identity and version.
pub fn assert_identity(resource: &StoredResource, resource_type: &str, id: &str, version: u64) {
    assert_eq!(resource.resource_type().as_str(), resource_type);
    assert_eq!(resource.id(), id);
    assert_eq!(resource.version(), version);
    assert_eq!(resource.content()["id"], id);
    assert_eq!(resource.content()["resourceType"], resource_type);
    assert_eq!(
        resource.content()["meta"]["versionId"],
        version.to_string(),
        "meta.versionId out of sync"
    );
}
