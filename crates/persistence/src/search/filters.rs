//! Search filter resolution.
//!
//! Maps the raw `(name, value)` pairs of a [`SearchQuery`] onto index
//! columns and match semantics for the query's resource type, rejecting
//! anything that cannot be executed before SQL is built.

use chrono::{DateTime, NaiveDate};

use crate::error::{StorageError, StorageResult};
use crate::types::{ReferenceValue, ResourceType, SearchQuery};

/// How a filter value is matched against its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Equality.
    Exact,
    /// Case-insensitive substring.
    Substring,
    /// Same calendar day, comparing the date as written.
    Day,
    /// Equality on the bare id of a reference column.
    Reference,
    /// A DiagnosticReport result list contains the Observation id.
    ResultReference,
}

/// A filter name accepted for a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDef {
    /// Query parameter name.
    pub name: &'static str,
    /// Column of the type's index table.
    pub column: &'static str,
    /// Match semantics.
    pub kind: FilterKind,
}

const fn def(name: &'static str, column: &'static str, kind: FilterKind) -> FilterDef {
    FilterDef { name, column, kind }
}

use FilterKind::{Day, Exact, Reference, ResultReference, Substring};

const PATIENT_FILTERS: &[FilterDef] = &[
    def("_id", "id", Exact),
    def("identifier", "identifier", Exact),
    def("gender", "gender", Exact),
    def("family", "family", Substring),
    def("given", "given", Substring),
    def("birthdate", "birth_date", Day),
];

const OBSERVATION_FILTERS: &[FilterDef] = &[
    def("_id", "id", Exact),
    def("code", "code", Exact),
    def("status", "status", Exact),
    def("category", "category", Exact),
    def("value-concept", "value_code", Exact),
    def("date", "effective", Day),
    def("subject", "subject", Reference),
    def("patient", "subject", Reference),
];

const DIAGNOSTIC_REPORT_FILTERS: &[FilterDef] = &[
    def("_id", "id", Exact),
    def("code", "code", Exact),
    def("status", "status", Exact),
    def("category", "category", Exact),
    def("date", "effective", Day),
    def("issued", "issued", Day),
    def("subject", "subject", Reference),
    def("patient", "subject", Reference),
    def("result", "observation_id", ResultReference),
];

const SERVICE_REQUEST_FILTERS: &[FilterDef] = &[
    def("_id", "id", Exact),
    def("code", "code", Exact),
    def("status", "status", Exact),
    def("intent", "intent", Exact),
    def("category", "category", Exact),
    def("priority", "priority", Exact),
    def("authored", "authored", Day),
    def("occurrence", "occurrence", Day),
    def("subject", "subject", Reference),
    def("patient", "subject", Reference),
    def("requester", "requester", Reference),
    def("performer", "performer", Reference),
];

/// Returns the filters accepted for a resource type.
pub fn filter_defs(resource_type: ResourceType) -> &'static [FilterDef] {
    match resource_type {
        ResourceType::Patient => PATIENT_FILTERS,
        ResourceType::Observation => OBSERVATION_FILTERS,
        ResourceType::DiagnosticReport => DIAGNOSTIC_REPORT_FILTERS,
        ResourceType::ServiceRequest => SERVICE_REQUEST_FILTERS,
    }
}

/// A filter ready for execution, with its value normalized for its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFilter {
    /// Parameter name as supplied.
    pub name: String,
    /// Column of the type's index table.
    pub column: &'static str,
    /// Match semantics.
    pub kind: FilterKind,
    /// Day filters hold `YYYY-MM-DD`, reference filters hold the bare id and
    /// substring filters hold the lowercased text.
    pub value: String,
}

/// Resolves and validates every filter of a query.
///
/// # Errors
///
/// `SearchError::InvalidParameter` naming the parameter when the name is
/// not accepted for the type, the value is empty, or a day value is not a
/// date or date-time.
pub fn resolve_filters(query: &SearchQuery) -> StorageResult<Vec<ResolvedFilter>> {
    let defs = filter_defs(query.resource_type);

    query
        .filters
        .iter()
        .map(|(name, value)| {
            let def = defs.iter().find(|d| d.name == name.as_str()).ok_or_else(|| {
                StorageError::invalid_parameter(
                    name,
                    format!("unknown search parameter for {}", query.resource_type),
                )
            })?;
            resolve_one(def, name, value)
        })
        .collect()
}

fn resolve_one(def: &FilterDef, name: &str, value: &str) -> StorageResult<ResolvedFilter> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StorageError::invalid_parameter(name, "value must not be empty"));
    }

    let value = match def.kind {
        Exact => trimmed.to_string(),
        Substring => trimmed.to_lowercase(),
        Day => day_of(trimmed).ok_or_else(|| {
            StorageError::invalid_parameter(
                name,
                format!("'{trimmed}' is not a date (YYYY-MM-DD) or date-time"),
            )
        })?,
        Reference | ResultReference => ReferenceValue::parse(trimmed)
            .map(|r| r.id().to_string())
            .ok_or_else(|| StorageError::invalid_parameter(name, "not a reference"))?,
    };

    Ok(ResolvedFilter {
        name: name.to_string(),
        column: def.column,
        kind: def.kind,
        value,
    })
}

/// The calendar day of a date or date-time literal, as written.
fn day_of(literal: &str) -> Option<String> {
    if literal.len() == 10 && NaiveDate::parse_from_str(literal, "%Y-%m-%d").is_ok() {
        return Some(literal.to_string());
    }
    DateTime::parse_from_rfc3339(literal)
        .ok()
        .map(|_| literal[..10].to_string())
}
