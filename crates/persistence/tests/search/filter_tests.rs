//! Tests for search filters.

use serde_json::json;

use clinical_persistence::backends::sqlite::SqliteBackend;
use clinical_persistence::core::{ResourceStorage, SearchProvider};
use clinical_persistence::error::ErrorKind;
use clinical_persistence::types::{ResourceType, SearchQuery};

use crate::common::*;

// ============================================================================
// Helper Functions
// ============================================================================

async fn ids(backend: &SqliteBackend, query: SearchQuery) -> Vec<String> {
    backend
        .search(&query)
        .await
        .unwrap()
        .resources
        .iter()
        .map(|r| r.id().to_string())
        .collect()
}

async fn seed_patients(backend: &SqliteBackend) {
    let patients = [
        json!({"id": "p1", "name": [{"family": "Smith", "given": ["Ann", "Marie"]}],
               "gender": "female", "birthDate": "1980-05-01",
               "identifier": [{"system": "urn:mrn", "value": "MRN-1"}]}),
        json!({"id": "p2", "name": [{"family": "Blacksmith", "given": ["Bob"]}],
               "gender": "male", "birthDate": "1975-01-20"}),
        json!({"id": "p3", "name": [{"family": "Jones", "given": ["Cara"]}],
               "gender": "female", "birthDate": "1980-05-01"}),
        json!({"id": "p4", "name": [{"family": "100%_Real"}]}),
    ];
    for patient in patients {
        backend.create(ResourceType::Patient, patient).await.unwrap();
    }
}

// ============================================================================
// Patient
// ============================================================================

/// Name filters are case-insensitive substrings.
#[tokio::test]
async fn test_patient_name_substring() {
    let backend = create_backend();
    seed_patients(&backend).await;

    let q = SearchQuery::new(ResourceType::Patient).with_filter("family", "SMITH");
    assert_eq!(ids(&backend, q).await, vec!["p1", "p2"]);

    let q = SearchQuery::new(ResourceType::Patient).with_filter("given", "mar");
    assert_eq!(ids(&backend, q).await, vec!["p1"]);
}

/// Case folding covers letters outside ASCII.
#[tokio::test]
async fn test_patient_name_non_ascii_case_insensitive() {
    let backend = create_backend();
    backend
        .create(ResourceType::Patient, json!({"id": "is1", "name": [{"family": "Ólafsson", "given": ["Þóra"]}]}))
        .await
        .unwrap();
    backend
        .create(ResourceType::Patient, json!({"id": "de1", "name": [{"family": "MÜLLER"}]}))
        .await
        .unwrap();

    let q = SearchQuery::new(ResourceType::Patient).with_filter("family", "ólaf");
    assert_eq!(ids(&backend, q).await, vec!["is1"]);

    let q = SearchQuery::new(ResourceType::Patient).with_filter("family", "müller");
    assert_eq!(ids(&backend, q).await, vec!["de1"]);

    let q = SearchQuery::new(ResourceType::Patient).with_filter("given", "ÞÓR");
    assert_eq!(ids(&backend, q).await, vec!["is1"]);

    // Stored payload keeps the original spelling.
    let patient = backend.read(ResourceType::Patient, "is1").await.unwrap();
    assert_eq!(patient.content()["name"][0]["family"], "Ólafsson");
}

/// LIKE wildcards in filter values match literally.
#[tokio::test]
async fn test_patient_name_wildcards_are_literal() {
    let backend = create_backend();
    seed_patients(&backend).await;

    let q = SearchQuery::new(ResourceType::Patient).with_filter("family", "%");
    assert_eq!(ids(&backend, q).await, vec!["p4"]);

    let q = SearchQuery::new(ResourceType::Patient).with_filter("family", "_");
    assert_eq!(ids(&backend, q).await, vec!["p4"]);
}

/// Exact filters and the calendar-day filter combine with AND.
#[tokio::test]
async fn test_patient_exact_and_day() {
    let backend = create_backend();
    seed_patients(&backend).await;

    let q = SearchQuery::new(ResourceType::Patient)
        .with_filter("gender", "female")
        .with_filter("birthdate", "1980-05-01");
    assert_eq!(ids(&backend, q).await, vec!["p1", "p3"]);

    let q = SearchQuery::new(ResourceType::Patient).with_filter("identifier", "MRN-1");
    assert_eq!(ids(&backend, q).await, vec!["p1"]);

    let q = SearchQuery::new(ResourceType::Patient).with_filter("_id", "p3");
    assert_eq!(ids(&backend, q).await, vec!["p3"]);
}

/// Repeating a filter name ANDs both values.
#[tokio::test]
async fn test_repeated_filter_is_and() {
    let backend = create_backend();
    seed_patients(&backend).await;

    let q = SearchQuery::new(ResourceType::Patient)
        .with_filter("gender", "female")
        .with_filter("gender", "male");
    assert!(ids(&backend, q).await.is_empty());

    let q = SearchQuery::new(ResourceType::Patient)
        .with_filter("family", "smith")
        .with_filter("family", "black");
    assert_eq!(ids(&backend, q).await, vec!["p2"]);
}

// ============================================================================
// Observation
// ============================================================================

/// Subject and patient filters accept bare and prefixed ids.
#[tokio::test]
async fn test_observation_subject_filters() {
    let backend = create_backend();
    seed_patient(&backend, "p1", "Smith").await;
    seed_patient(&backend, "p2", "Jones").await;
    seed_observations(&backend, "p1", 3).await;
    seed_observations(&backend, "p2", 2).await;

    for (name, value) in [("subject", "Patient/p2"), ("patient", "p2"), ("subject", "p2")] {
        let q = SearchQuery::new(ResourceType::Observation).with_filter(name, value);
        assert_eq!(ids(&backend, q).await, vec!["obs-p2-000", "obs-p2-001"], "{name}={value}");
    }
}

/// Code, status, category, date and value-concept filters.
#[tokio::test]
async fn test_observation_filters() {
    let backend = create_backend();
    seed_patient(&backend, "p1", "Smith").await;

    let glucose = observation_json("Patient/p1", "2345-7", "2024-03-01T23:30:00+02:00");
    let mut preliminary = observation_json("Patient/p1", "2345-7", "2024-03-02T08:00:00Z");
    preliminary["status"] = json!("preliminary");
    let mut coded = observation_json("Patient/p1", "883-9", "2024-03-01");
    coded.as_object_mut().unwrap().remove("valueQuantity");
    coded["valueCodeableConcept"] = json!({"coding": [{"code": "A+"}]});

    let mut created = Vec::new();
    for observation in [glucose, preliminary, coded] {
        created.push(
            backend
                .create(ResourceType::Observation, observation)
                .await
                .unwrap()
                .id()
                .to_string(),
        );
    }

    let q = SearchQuery::new(ResourceType::Observation)
        .with_filter("code", "2345-7")
        .with_filter("status", "final");
    assert_eq!(ids(&backend, q).await, vec![created[0].clone()]);

    // Day equality uses the date as written, not normalized to UTC.
    let q = SearchQuery::new(ResourceType::Observation).with_filter("date", "2024-03-01");
    assert_eq!(ids(&backend, q).await, vec![created[0].clone(), created[2].clone()]);

    let q = SearchQuery::new(ResourceType::Observation)
        .with_filter("date", "2024-03-02T00:00:00Z");
    assert_eq!(ids(&backend, q).await, vec![created[1].clone()]);

    let q = SearchQuery::new(ResourceType::Observation).with_filter("value-concept", "A+");
    assert_eq!(ids(&backend, q).await, vec![created[2].clone()]);

    let q = SearchQuery::new(ResourceType::Observation).with_filter("category", "laboratory");
    assert_eq!(backend.search_count(&q).await.unwrap(), 3);
}

// ============================================================================
// DiagnosticReport and ServiceRequest
// ============================================================================

/// Reports can be found by any of their results.
#[tokio::test]
async fn test_report_result_filter() {
    let backend = create_backend();
    seed_patient(&backend, "p1", "Smith").await;
    seed_observations(&backend, "p1", 3).await;

    let r1 = backend
        .create(
            ResourceType::DiagnosticReport,
            report_json("Patient/p1", &["Observation/obs-p1-000", "Observation/obs-p1-001"]),
        )
        .await
        .unwrap();
    let r2 = backend
        .create(
            ResourceType::DiagnosticReport,
            report_json("Patient/p1", &["Observation/obs-p1-002"]),
        )
        .await
        .unwrap();

    let q = SearchQuery::new(ResourceType::DiagnosticReport)
        .with_filter("result", "Observation/obs-p1-001");
    assert_eq!(ids(&backend, q).await, vec![r1.id().to_string()]);

    let q = SearchQuery::new(ResourceType::DiagnosticReport)
        .with_filter("result", "obs-p1-002")
        .with_filter("issued", "2024-03-02");
    assert_eq!(ids(&backend, q).await, vec![r2.id().to_string()]);

    let q = SearchQuery::new(ResourceType::DiagnosticReport).with_filter("date", "2024-03-02");
    assert!(ids(&backend, q).await.is_empty());
}

/// Order filters cover requester, performer, priority and dates.
#[tokio::test]
async fn test_order_filters() {
    let backend = create_backend();
    seed_patient(&backend, "p1", "Smith").await;
    let urgent = backend
        .create(ResourceType::ServiceRequest, order_json("Patient/p1", "urgent"))
        .await
        .unwrap();
    backend
        .create(ResourceType::ServiceRequest, order_json("Patient/p1", "routine"))
        .await
        .unwrap();

    let q = SearchQuery::new(ResourceType::ServiceRequest)
        .with_filter("priority", "urgent")
        .with_filter("requester", "Practitioner/dr-1")
        .with_filter("performer", "lab-1")
        .with_filter("authored", "2024-02-28")
        .with_filter("occurrence", "2024-03-05")
        .with_filter("intent", "order");
    assert_eq!(ids(&backend, q).await, vec![urgent.id().to_string()]);
}

// ============================================================================
// Deleted Records and Rejections
// ============================================================================

/// Deleted records never match, whatever the filters.
#[tokio::test]
async fn test_deleted_never_match() {
    let backend = create_backend();
    seed_patients(&backend).await;
    seed_observations(&backend, "p1", 2).await;
    backend.delete(ResourceType::Patient, "p1").await.unwrap();
    backend
        .delete(ResourceType::Observation, "obs-p1-000")
        .await
        .unwrap();

    let queries = [
        SearchQuery::new(ResourceType::Patient),
        SearchQuery::new(ResourceType::Patient).with_filter("_id", "p1"),
        SearchQuery::new(ResourceType::Patient).with_filter("family", "smith"),
        SearchQuery::new(ResourceType::Patient).with_filter("birthdate", "1980-05-01"),
        SearchQuery::new(ResourceType::Observation).with_filter("patient", "p1"),
        SearchQuery::new(ResourceType::Observation).with_filter("code", "2345-7"),
    ];

    for query in queries {
        let result = backend.search(&query).await.unwrap();
        assert!(
            result.resources.iter().all(|r| !r.is_deleted()
                && r.id() != "p1"
                && r.id() != "obs-p1-000"),
            "deleted record matched {query:?}"
        );
        assert_eq!(result.total, backend.search_count(&query).await.unwrap());
    }
}

/// Unknown filters are rejected naming the parameter.
#[tokio::test]
async fn test_unknown_filter() {
    let backend = create_backend();

    let q = SearchQuery::new(ResourceType::Patient).with_filter("code", "x");
    let field = assert_error_kind(backend.search(&q).await, ErrorKind::InvalidParameter);
    assert_eq!(field.as_deref(), Some("code"));
}

/// An unparsable date is rejected before any SQL runs.
#[tokio::test]
async fn test_bad_date_filter() {
    let backend = create_backend();
    seed_patient(&backend, "p1", "Smith").await;
    seed_observations(&backend, "p1", 3).await;

    for bad in ["yesterday", "2024-13-01", "2024-3-1", "2024-03-01T25:00:00Z"] {
        let q = SearchQuery::new(ResourceType::Observation)
            .with_filter("patient", "p1")
            .with_filter("date", bad);
        let field = assert_error_kind(backend.search(&q).await, ErrorKind::InvalidParameter);
        assert_eq!(field.as_deref(), Some("date"), "{bad}");
    }

    let read = backend
        .read(ResourceType::Observation, "obs-p1-000")
        .await
        .unwrap();
    assert_eq!(read.version(), 1);
    assert_eq!(backend.count(ResourceType::Observation).await.unwrap(), 3);
}

/// Empty filter values are rejected.
#[tokio::test]
async fn test_empty_filter_value() {
    let backend = create_backend();

    let q = SearchQuery::new(ResourceType::Observation).with_filter("status", "  ");
    assert_error_kind(backend.search(&q).await, ErrorKind::InvalidParameter);
}
