//! Typed index views of stored resources.
//!
//! [`IndexFields`] is the only typed view of a resource the store and the
//! search engine look at. It is produced by the extractor
//! ([`crate::search::extractor`]) and persisted into one index table per
//! resource type alongside the canonical payload.

// Field names match their index columns
#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use super::ResourceType;

/// A parsed reference to another resource.
///
/// Keeps the text as written together with the optional type prefix and
/// the bare id. Storage and lookups use the bare id; the reference
/// validator inspects the prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceValue {
    raw: String,
    type_prefix: Option<String>,
    id: String,
}

impl ReferenceValue {
    /// Parses a reference string.
    ///
    /// Accepts `id`, `Type/id` and absolute URLs ending in `Type/id`. A
    /// trailing `/_history/{vid}` is ignored. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let unversioned = match trimmed.find("/_history/") {
            Some(pos) => &trimmed[..pos],
            None => trimmed,
        };

        let mut segments = unversioned.rsplit('/').filter(|s| !s.is_empty());
        let id = segments.next()?.to_string();
        let type_prefix = segments.next().map(String::from);

        Some(Self {
            raw: trimmed.to_string(),
            type_prefix,
            id,
        })
    }

    /// Returns the reference exactly as written.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the explicit type prefix, if the reference carried one.
    pub fn type_prefix(&self) -> Option<&str> {
        self.type_prefix.as_deref()
    }

    /// Returns the bare id.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// The value of an Observation, when it is numeric or coded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObservationValue {
    /// `valueQuantity`
    Quantity { value: f64, unit: Option<String> },
    /// First code of `valueCodeableConcept`.
    Coded(String),
}

/// Patient index columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientIndex {
    pub family: Option<String>,
    /// Given names of the first name entry, space-joined.
    pub given: Option<String>,
    pub identifier: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
}

/// Observation index columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationIndex {
    pub code: Option<String>,
    pub code_display: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub effective: Option<String>,
    pub value: Option<ObservationValue>,
    pub subject: Option<ReferenceValue>,
}

/// DiagnosticReport index columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReportIndex {
    pub code: Option<String>,
    pub code_display: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub effective: Option<String>,
    pub issued: Option<String>,
    /// Result references in payload order.
    pub results: Vec<ReferenceValue>,
    pub conclusion: Option<String>,
    pub subject: Option<ReferenceValue>,
}

/// ServiceRequest index columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequestIndex {
    pub code: Option<String>,
    pub status: Option<String>,
    pub intent: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub authored: Option<String>,
    pub occurrence: Option<String>,
    pub requester: Option<ReferenceValue>,
    pub performer: Option<ReferenceValue>,
    pub subject: Option<ReferenceValue>,
}

/// Extracted, independently queryable fields of one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexFields {
    Patient(PatientIndex),
    Observation(ObservationIndex),
    DiagnosticReport(DiagnosticReportIndex),
    ServiceRequest(ServiceRequestIndex),
}

impl IndexFields {
    /// Returns the resource type these fields belong to.
    pub fn resource_type(&self) -> ResourceType {
        match self {
            IndexFields::Patient(_) => ResourceType::Patient,
            IndexFields::Observation(_) => ResourceType::Observation,
            IndexFields::DiagnosticReport(_) => ResourceType::DiagnosticReport,
            IndexFields::ServiceRequest(_) => ResourceType::ServiceRequest,
        }
    }

    /// Returns the subject reference, for types that carry one.
    pub fn subject(&self) -> Option<&ReferenceValue> {
        match self {
            IndexFields::Patient(_) => None,
            IndexFields::Observation(idx) => idx.subject.as_ref(),
            IndexFields::DiagnosticReport(idx) => idx.subject.as_ref(),
            IndexFields::ServiceRequest(idx) => idx.subject.as_ref(),
        }
    }

    /// Returns the status, for types that carry one.
    pub fn status(&self) -> Option<&str> {
        match self {
            IndexFields::Patient(_) => None,
            IndexFields::Observation(idx) => idx.status.as_deref(),
            IndexFields::DiagnosticReport(idx) => idx.status.as_deref(),
            IndexFields::ServiceRequest(idx) => idx.status.as_deref(),
        }
    }

    /// Returns the DiagnosticReport result references (empty for other types).
    pub fn results(&self) -> &[ReferenceValue] {
        match self {
            IndexFields::DiagnosticReport(idx) => &idx.results,
            _ => &[],
        }
    }
}
