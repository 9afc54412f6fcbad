//! Tests for version reads and version listing.

use clinical_persistence::core::{ResourceStorage, VersionedStorage};
use clinical_persistence::error::{ErrorKind, ResourceError, StorageError};
use clinical_persistence::types::ResourceType;

use crate::common::*;

/// Every accepted version stays readable with its own metadata.
#[tokio::test]
async fn test_vread_each_version() {
    let backend = create_backend();
    let v1 = seed_patient(&backend, "p1", "Smith").await;
    let v2 = backend
        .update(ResourceType::Patient, "p1", patient_json(None, "Smyth", &[]))
        .await
        .unwrap();

    let old = backend.vread(ResourceType::Patient, "p1", 1).await.unwrap();
    assert_identity(&old, "Patient", "p1", 1);
    assert_eq!(old.content()["name"][0]["family"], "Smith");
    assert_eq!(old.last_updated(), v1.last_updated());
    assert_eq!(old.created_at(), v1.created_at());

    let new = backend.vread(ResourceType::Patient, "p1", 2).await.unwrap();
    assert_eq!(new.content(), v2.content());
    assert_eq!(new.versioned_url(), "Patient/p1/_history/2");

    assert_eq!(
        backend.list_versions(ResourceType::Patient, "p1").await.unwrap(),
        vec![1, 2]
    );
    assert_eq!(
        backend.current_version(ResourceType::Patient, "p1").await.unwrap(),
        2
    );
}

/// Unknown versions are not found.
#[tokio::test]
async fn test_vread_unknown_version() {
    let backend = create_backend();
    seed_patient(&backend, "p1", "Smith").await;

    match backend.vread(ResourceType::Patient, "p1", 7).await {
        Err(StorageError::Resource(ResourceError::NotFound { id, .. })) => {
            assert_eq!(id, "p1/_history/7");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

/// Deleting a resource hides its history.
#[tokio::test]
async fn test_history_hidden_after_delete() {
    let backend = create_backend();
    seed_patient(&backend, "p1", "Smith").await;
    backend.delete(ResourceType::Patient, "p1").await.unwrap();

    assert_error_kind(
        backend.vread(ResourceType::Patient, "p1", 1).await,
        ErrorKind::NotFound,
    );
    assert_error_kind(
        backend.list_versions(ResourceType::Patient, "p1").await,
        ErrorKind::NotFound,
    );
}

/// Each write is stamped strictly after the previous one.
#[tokio::test]
async fn test_last_updated_strictly_increases() {
    let backend = create_backend();
    let mut previous = seed_patient(&backend, "p1", "Smith").await.last_updated();

    for i in 0..20 {
        let updated = backend
            .update(ResourceType::Patient, "p1", patient_json(None, &format!("S{i}"), &[]))
            .await
            .unwrap();
        assert!(updated.last_updated() > previous);
        previous = updated.last_updated();
    }
}
