//! Core types for the persistence layer.
//!
//! - [`ResourceType`] - The closed set of served resource types
//! - [`StoredResource`] - A resource payload with persistence metadata
//! - [`IndexFields`] - The typed, queryable view of a resource
//! - [`SearchQuery`] - Filters plus paging for one resource type
//! - [`SearchBundle`] - The searchset envelope returned to callers
//!
//! # Examples
//!
//! ```
//! use clinical_persistence::types::{ResourceType, SearchQuery};
//!
//! let query = SearchQuery::from_query_pairs(
//!     ResourceType::Observation,
//!     [("subject", "Patient/p1"), ("status", "final"), ("_count", "10")],
//! )
//! .unwrap();
//!
//! assert_eq!(query.page_size, 10);
//! assert_eq!(query.filters.len(), 2);
//! ```

mod bundle;
mod index_fields;
mod resource_type;
mod search_query;
mod stored_resource;

pub use bundle::{BundleEntry, BundleEntrySearch, BundleLink, SearchBundle, SearchEntryMode};
pub use index_fields::{
    DiagnosticReportIndex, IndexFields, ObservationIndex, ObservationValue, PatientIndex,
    ReferenceValue, ServiceRequestIndex,
};
pub use resource_type::ResourceType;
pub use search_query::{
    COUNT_PARAM, DEFAULT_PAGE_SIZE, MAX_OFFSET, MAX_PAGE_SIZE, OFFSET_PARAM, SearchQuery,
};
pub use stored_resource::StoredResource;
