//! Test fixtures for persistence layer testing.
//!
//! Builders for the four served resource types, plus helpers that seed a
//! backend with linked records.

#![allow(dead_code)]

use serde_json::{Value, json};

use clinical_persistence::backends::sqlite::{SqliteBackend, SqliteBackendConfig};
use clinical_persistence::core::ResourceStorage;
use clinical_persistence::types::{ResourceType, StoredResource};

/// Creates a fresh in-memory backend with the schema installed.
pub fn create_backend() -> SqliteBackend {
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    backend.init_schema().expect("Failed to initialize schema");
    backend
}

/// Creates a file-backed backend inside `dir`.
pub fn create_file_backend(dir: &tempfile::TempDir) -> SqliteBackend {
    let path = dir.path().join("clinical.db");
    let backend = SqliteBackend::with_config(&path, SqliteBackendConfig::default())
        .expect("Failed to open SQLite file");
    backend.init_schema().expect("Failed to initialize schema");
    backend
}

/// A Patient payload.
pub fn patient_json(id: Option<&str>, family: &str, given: &[&str]) -> Value {
    let mut patient = json!({
        "resourceType": "Patient",
        "name": [{"family": family, "given": given}],
    });
    if let Some(id) = id {
        patient["id"] = json!(id);
    }
    patient
}

/// An Observation payload for `subject`, carrying a quantity.
pub fn observation_json(subject: &str, code: &str, effective: &str) -> Value {
    json!({
        "resourceType": "Observation",
        "status": "final",
        "category": [{"coding": [{"code": "laboratory"}]}],
        "code": {"coding": [{"system": "http://loinc.org", "code": code, "display": "Glucose"}]},
        "subject": {"reference": subject},
        "effectiveDateTime": effective,
        "valueQuantity": {"value": 5.4, "unit": "mmol/L"}
    })
}

/// A DiagnosticReport payload for `subject` with ordered results.
pub fn report_json(subject: &str, results: &[&str]) -> Value {
    let results: Vec<Value> = results.iter().map(|r| json!({"reference": r})).collect();
    json!({
        "resourceType": "DiagnosticReport",
        "status": "final",
        "code": {"coding": [{"code": "58410-2"}], "text": "CBC panel"},
        "subject": {"reference": subject},
        "effectiveDateTime": "2024-03-01T09:30:00Z",
        "issued": "2024-03-02T12:00:00Z",
        "result": results,
        "conclusion": "Within normal limits"
    })
}

/// A ServiceRequest (order) payload for `subject`.
pub fn order_json(subject: &str, priority: &str) -> Value {
    json!({
        "resourceType": "ServiceRequest",
        "status": "active",
        "intent": "order",
        "priority": priority,
        "code": {"coding": [{"code": "24331-1"}]},
        "subject": {"reference": subject},
        "authoredOn": "2024-02-28T08:00:00Z",
        "occurrenceDateTime": "2024-03-05",
        "requester": {"reference": "Practitioner/dr-1"},
        "performer": [{"reference": "Organization/lab-1"}]
    })
}

/// Creates a Patient with a fixed id.
pub async fn seed_patient(backend: &SqliteBackend, id: &str, family: &str) -> StoredResource {
    backend
        .create(ResourceType::Patient, patient_json(Some(id), family, &["Ann"]))
        .await
        .expect("Failed to seed patient")
}

/// Creates `count` Observations for `patient_id`, returning them in creation order.
pub async fn seed_observations(
    backend: &SqliteBackend,
    patient_id: &str,
    count: usize,
) -> Vec<StoredResource> {
    let mut created = Vec::with_capacity(count);
    for i in 0..count {
        let mut observation = observation_json(
            &format!("Patient/{patient_id}"),
            "2345-7",
            &format!("2024-03-{:02}T08:00:00Z", (i % 28) + 1),
        );
        observation["id"] = json!(format!("obs-{patient_id}-{i:03}"));
        created.push(
            backend
                .create(ResourceType::Observation, observation)
                .await
                .expect("Failed to seed observation"),
        );
    }
    created
}
