//! Tests for search paging and ordering.

use clinical_persistence::core::{ResourceStorage, SearchProvider};
use clinical_persistence::error::ErrorKind;
use clinical_persistence::types::{DEFAULT_PAGE_SIZE, ResourceType, SearchBundle, SearchQuery};

use crate::common::*;

const BASE: &str = "http://localhost:8080/fhir";

/// 25 observations paged by 10: first and last pages with their links.
#[tokio::test]
async fn test_twenty_five_observations_by_ten() {
    let backend = create_backend();
    seed_patient(&backend, "p1", "Smith").await;
    seed_observations(&backend, "p1", 25).await;

    let first = SearchQuery::new(ResourceType::Observation)
        .with_filter("patient", "p1")
        .with_page_size(10);
    let result = backend.search(&first).await.unwrap();
    let bundle = SearchBundle::assemble(&result, &first, BASE);

    assert_eq!(bundle.total, 25);
    assert_eq!(bundle.entry.len(), 10);
    let next = bundle.link_url("next").expect("next link");
    assert!(next.contains("_offset=10"), "{next}");
    assert!(bundle.link_url("previous").is_none());

    let last = first.clone().with_offset(20);
    let result = backend.search(&last).await.unwrap();
    let bundle = SearchBundle::assemble(&result, &last, BASE);

    assert_eq!(bundle.total, 25);
    assert_eq!(bundle.entry.len(), 5);
    let previous = bundle.link_url("previous").expect("previous link");
    assert!(previous.contains("_offset=10"), "{previous}");
    assert!(bundle.link_url("next").is_none());
}

/// Entry count is min(P, max(0, T - O)) for every offset.
#[tokio::test]
async fn test_entry_count_formula() {
    let backend = create_backend();
    seed_patient(&backend, "p1", "Smith").await;
    seed_observations(&backend, "p1", 12).await;

    for page_size in [1usize, 5, 12, 100] {
        for offset in [0usize, 4, 11, 12, 30] {
            let query = SearchQuery::new(ResourceType::Observation)
                .with_page_size(page_size)
                .with_offset(offset);
            let result = backend.search(&query).await.unwrap();

            assert_eq!(result.total, 12);
            assert_eq!(
                result.resources.len(),
                page_size.min(12usize.saturating_sub(offset)),
                "page_size={page_size} offset={offset}"
            );
        }
    }
}

/// Pages are ordered by last update, so walking them visits every record once.
#[tokio::test]
async fn test_pages_follow_update_order() {
    let backend = create_backend();
    seed_patient(&backend, "p1", "Smith").await;
    let seeded = seed_observations(&backend, "p1", 7).await;

    // Touch the first record so it moves to the end.
    backend
        .update(
            ResourceType::Observation,
            seeded[0].id(),
            seeded[0].content().clone(),
        )
        .await
        .unwrap();

    let mut walked = Vec::new();
    let mut query = SearchQuery::new(ResourceType::Observation).with_page_size(3);
    loop {
        let result = backend.search(&query).await.unwrap();
        walked.extend(result.resources.iter().map(|r| r.id().to_string()));
        let bundle = SearchBundle::assemble(&result, &query, BASE);
        match bundle.link_url("next") {
            Some(next) => query = SearchQuery::from_link(next).unwrap(),
            None => break,
        }
    }

    let mut expected: Vec<String> = seeded[1..].iter().map(|r| r.id().to_string()).collect();
    expected.push(seeded[0].id().to_string());
    assert_eq!(walked, expected);
}

/// Without paging parameters the default page size and the same order apply.
#[tokio::test]
async fn test_unpaged_defaults() {
    let backend = create_backend();
    seed_patient(&backend, "p1", "Smith").await;
    let seeded = seed_observations(&backend, "p1", 22).await;

    let query = SearchQuery::from_query_pairs(ResourceType::Observation, [("patient", "p1")]).unwrap();
    let result = backend.search(&query).await.unwrap();

    assert_eq!(result.total, 22);
    assert_eq!(result.resources.len(), DEFAULT_PAGE_SIZE);
    assert_eq!(result.resources[0].id(), seeded[0].id());
    assert!(
        result
            .resources
            .windows(2)
            .all(|w| w[0].last_updated() <= w[1].last_updated())
    );
}

/// Out-of-range paging is rejected naming the parameter.
#[tokio::test]
async fn test_invalid_paging() {
    let backend = create_backend();

    for page_size in [0usize, 101] {
        let query = SearchQuery::new(ResourceType::Patient).with_page_size(page_size);
        let field = assert_error_kind(backend.search(&query).await, ErrorKind::InvalidParameter);
        assert_eq!(field.as_deref(), Some("_count"));
    }

    let query = SearchQuery::new(ResourceType::Patient).with_offset(usize::MAX);
    let field = assert_error_kind(backend.search(&query).await, ErrorKind::InvalidParameter);
    assert_eq!(field.as_deref(), Some("_offset"));
    let field = assert_error_kind(backend.search_count(&query).await, ErrorKind::InvalidParameter);
    assert_eq!(field.as_deref(), Some("_offset"));

    let field = assert_error_kind(
        SearchQuery::from_query_pairs(ResourceType::Patient, [("_offset", "-1")]),
        ErrorKind::InvalidParameter,
    );
    assert_eq!(field.as_deref(), Some("_offset"));

    let field = assert_error_kind(
        SearchQuery::from_query_pairs(ResourceType::Patient, [("_count", "ten")]),
        ErrorKind::InvalidParameter,
    );
    assert_eq!(field.as_deref(), Some("_count"));
}
