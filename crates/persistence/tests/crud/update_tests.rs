//! Tests for resource updates.

use serde_json::json;

use clinical_persistence::core::ResourceStorage;
use clinical_persistence::error::ErrorKind;
use clinical_persistence::types::{IndexFields, ResourceType};

use crate::common::*;

/// Updating a Patient twice yields version 3 with non-decreasing timestamps.
#[tokio::test]
async fn test_update_twice() {
    let backend = create_backend();
    let v1 = seed_patient(&backend, "p1", "Smith").await;

    let v2 = backend
        .update(ResourceType::Patient, "p1", patient_json(None, "Smyth", &[]))
        .await
        .unwrap();
    let v3 = backend
        .update(ResourceType::Patient, "p1", patient_json(Some("p1"), "Smithe", &[]))
        .await
        .unwrap();

    assert_eq!(v2.version(), 2);
    assert_eq!(v3.version(), 3);
    assert!(v1.last_updated() <= v2.last_updated());
    assert!(v2.last_updated() <= v3.last_updated());
    assert_eq!(v3.created_at(), v1.created_at());
    assert_identity(&v3, "Patient", "p1", 3);
}

/// The version sequence over N updates is exactly 1..=N+1.
#[tokio::test]
async fn test_version_sequence() {
    let backend = create_backend();
    let mut observed = vec![seed_patient(&backend, "p1", "Smith").await.version()];

    for i in 0..6 {
        let updated = backend
            .update(ResourceType::Patient, "p1", patient_json(None, &format!("Smith{i}"), &[]))
            .await
            .unwrap();
        observed.push(updated.version());
    }

    assert_eq!(observed, (1..=7).collect::<Vec<u64>>());
}

/// An update is a full replacement that also rewrites the index.
#[tokio::test]
async fn test_update_replaces_payload_and_index() {
    let backend = create_backend();
    let mut patient = patient_json(Some("p1"), "Smith", &["Ann"]);
    patient["gender"] = json!("female");
    backend.create(ResourceType::Patient, patient).await.unwrap();

    let updated = backend
        .update(ResourceType::Patient, "p1", patient_json(None, "Jones", &[]))
        .await
        .unwrap();

    assert!(updated.content().get("gender").is_none());
    match updated.index() {
        IndexFields::Patient(idx) => {
            assert_eq!(idx.family.as_deref(), Some("Jones"));
            assert_eq!(idx.gender, None);
        }
        other => panic!("unexpected index: {other:?}"),
    }
}

/// Updates of unknown ids are not found and create nothing.
#[tokio::test]
async fn test_update_unknown() {
    let backend = create_backend();

    assert_error_kind(
        backend
            .update(ResourceType::Patient, "ghost", patient_json(None, "Smith", &[]))
            .await,
        ErrorKind::NotFound,
    );
    assert!(!backend.exists(ResourceType::Patient, "ghost").await.unwrap());
}

/// The payload id must match the target id.
#[tokio::test]
async fn test_update_id_mismatch() {
    let backend = create_backend();
    seed_patient(&backend, "p1", "Smith").await;

    let field = assert_error_kind(
        backend
            .update(ResourceType::Patient, "p1", patient_json(Some("p2"), "Smith", &[]))
            .await,
        ErrorKind::IdMismatch,
    );
    assert_eq!(field.as_deref(), Some("id"));

    let read = backend.read(ResourceType::Patient, "p1").await.unwrap();
    assert_eq!(read.version(), 1);
}

/// A rejected update leaves the stored record untouched.
#[tokio::test]
async fn test_failed_update_leaves_record() {
    let backend = create_backend();
    seed_patient(&backend, "p1", "Smith").await;
    let original = backend
        .create(
            ResourceType::Observation,
            observation_json("Patient/p1", "2345-7", "2024-03-01"),
        )
        .await
        .unwrap();

    let result = backend
        .update(
            ResourceType::Observation,
            original.id(),
            observation_json("Patient/nobody", "9999-9", "2024-03-02"),
        )
        .await;
    assert_error_kind(result, ErrorKind::MissingReference);

    let read = backend
        .read(ResourceType::Observation, original.id())
        .await
        .unwrap();
    assert_eq!(read.version(), 1);
    assert_eq!(read.content(), original.content());
}
