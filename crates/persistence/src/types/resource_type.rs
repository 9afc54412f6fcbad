//! The closed set of resource types served by the store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, ValidationError};

/// A resource type handled by the store.
///
/// The four types share one storage shape and differ only in the fields
/// the extractor promotes to indexes, the references validated on write,
/// and the filters accepted by search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    /// Demographic record; the target of every subject reference.
    Patient,
    /// A single measurement or assertion about a patient.
    Observation,
    /// A grouped set of observations with an interpretation.
    DiagnosticReport,
    /// An order for a diagnostic test or procedure.
    ServiceRequest,
}

impl ResourceType {
    /// All supported types, in dependency order.
    pub const ALL: [ResourceType; 4] = [
        ResourceType::Patient,
        ResourceType::Observation,
        ResourceType::DiagnosticReport,
        ResourceType::ServiceRequest,
    ];

    /// Returns the wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Patient => "Patient",
            ResourceType::Observation => "Observation",
            ResourceType::DiagnosticReport => "DiagnosticReport",
            ResourceType::ServiceRequest => "ServiceRequest",
        }
    }

    /// Returns the name of the table holding this type's index columns.
    pub fn index_table(&self) -> &'static str {
        match self {
            ResourceType::Patient => "patient_index",
            ResourceType::Observation => "observation_index",
            ResourceType::DiagnosticReport => "diagnostic_report_index",
            ResourceType::ServiceRequest => "service_request_index",
        }
    }

    /// Returns `true` if writes of this type carry a subject reference.
    pub fn has_subject(&self) -> bool {
        !matches!(self, ResourceType::Patient)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Patient" => Ok(ResourceType::Patient),
            "Observation" => Ok(ResourceType::Observation),
            "DiagnosticReport" => Ok(ResourceType::DiagnosticReport),
            "ServiceRequest" | "Order" => Ok(ResourceType::ServiceRequest),
            other => Err(StorageError::Validation(
                ValidationError::UnsupportedResourceType {
                    resource_type: other.to_string(),
                },
            )),
        }
    }
}
