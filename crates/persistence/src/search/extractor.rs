//! Index field extraction.
//!
//! Derives the typed [`IndexFields`] view from a resource payload. The
//! extraction is a pure function of the payload: absent or malformed
//! optional data leaves the corresponding field unset and never fails.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use crate::error::ValidationError;
use crate::types::{
    DiagnosticReportIndex, IndexFields, ObservationIndex, ObservationValue, PatientIndex,
    ReferenceValue, ResourceType, ServiceRequestIndex,
};

/// Checks that a payload is a resource document of the target type.
///
/// The payload must be a JSON object. Its `resourceType`, when present,
/// must name `resource_type`. Every DiagnosticReport `result` entry must
/// carry a reference; an entry that does not is reported as `result[i]`.
pub fn check_payload(resource_type: ResourceType, resource: &Value) -> Result<(), ValidationError> {
    let obj = resource
        .as_object()
        .ok_or_else(|| ValidationError::InvalidResource {
            message: "Resource must be a JSON object".to_string(),
        })?;

    if let Some(other) = obj
        .get("resourceType")
        .filter(|rt| rt.as_str() != Some(resource_type.as_str()))
    {
        return Err(ValidationError::InvalidResource {
            message: format!(
                "Resource type mismatch: expected {}, got {}",
                resource_type, other
            ),
        });
    }

    if resource_type == ResourceType::DiagnosticReport {
        check_result_entries(obj.get("result"))?;
    }
    Ok(())
}

fn check_result_entries(results: Option<&Value>) -> Result<(), ValidationError> {
    let entries = match results {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(ValidationError::MalformedReference {
                field: "result".to_string(),
            });
        }
    };

    match entries.iter().position(|entry| reference(Some(entry)).is_none()) {
        Some(i) => Err(ValidationError::MalformedReference {
            field: format!("result[{i}]"),
        }),
        None => Ok(()),
    }
}

/// Extracts the index fields of a resource.
pub fn extract(resource_type: ResourceType, resource: &Value) -> IndexFields {
    match resource_type {
        ResourceType::Patient => IndexFields::Patient(extract_patient(resource)),
        ResourceType::Observation => IndexFields::Observation(extract_observation(resource)),
        ResourceType::DiagnosticReport => {
            IndexFields::DiagnosticReport(extract_diagnostic_report(resource))
        }
        ResourceType::ServiceRequest => {
            IndexFields::ServiceRequest(extract_service_request(resource))
        }
    }
}

/// Checks the fields each resource type cannot be stored without.
///
/// | Type | Required |
/// |------|----------|
/// | Patient | none |
/// | Observation | status, code, subject |
/// | DiagnosticReport | status, code, subject |
/// | ServiceRequest | status, intent, subject |
pub fn validate_required(fields: &IndexFields) -> Result<(), ValidationError> {
    let present: Vec<(&str, bool)> = match fields {
        IndexFields::Patient(_) => Vec::new(),
        IndexFields::Observation(idx) => vec![
            ("status", idx.status.is_some()),
            ("code", idx.code.is_some()),
            ("subject", idx.subject.is_some()),
        ],
        IndexFields::DiagnosticReport(idx) => vec![
            ("status", idx.status.is_some()),
            ("code", idx.code.is_some()),
            ("subject", idx.subject.is_some()),
        ],
        IndexFields::ServiceRequest(idx) => vec![
            ("status", idx.status.is_some()),
            ("intent", idx.intent.is_some()),
            ("subject", idx.subject.is_some()),
        ],
    };

    match present.into_iter().find(|(_, ok)| !ok) {
        Some((field, _)) => Err(ValidationError::MissingRequiredField {
            resource_type: fields.resource_type().to_string(),
            field: field.to_string(),
        }),
        None => Ok(()),
    }
}

fn extract_patient(resource: &Value) -> PatientIndex {
    let name = resource.get("name").and_then(first);
    let given = name
        .and_then(|n| n.get("given"))
        .and_then(Value::as_array)
        .map(|given| {
            given
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|s| !s.is_empty());

    PatientIndex {
        family: name.and_then(|n| string(n, "family")),
        given,
        identifier: resource
            .get("identifier")
            .and_then(first)
            .and_then(|i| string(i, "value")),
        birth_date: date(resource.get("birthDate")),
        gender: string(resource, "gender"),
    }
}

fn extract_observation(resource: &Value) -> ObservationIndex {
    let (code, code_display) = coding(resource.get("code"));

    let value = if let Some(quantity) = resource.get("valueQuantity") {
        quantity
            .get("value")
            .and_then(Value::as_f64)
            .map(|value| ObservationValue::Quantity {
                value,
                unit: string(quantity, "unit").or_else(|| string(quantity, "code")),
            })
    } else {
        coding(resource.get("valueCodeableConcept"))
            .0
            .map(ObservationValue::Coded)
    };

    ObservationIndex {
        code,
        code_display,
        status: string(resource, "status"),
        category: category(resource),
        effective: date_choice(resource, "effectiveDateTime", "effectivePeriod"),
        value,
        subject: reference(resource.get("subject")),
    }
}

fn extract_diagnostic_report(resource: &Value) -> DiagnosticReportIndex {
    let (code, code_display) = coding(resource.get("code"));

    DiagnosticReportIndex {
        code,
        code_display,
        status: string(resource, "status"),
        category: category(resource),
        effective: date_choice(resource, "effectiveDateTime", "effectivePeriod"),
        issued: date(resource.get("issued")),
        results: resource
            .get("result")
            .and_then(Value::as_array)
            .map(|results| results.iter().filter_map(|r| reference(Some(r))).collect())
            .unwrap_or_default(),
        conclusion: string(resource, "conclusion"),
        subject: reference(resource.get("subject")),
    }
}

fn extract_service_request(resource: &Value) -> ServiceRequestIndex {
    let performer = match resource.get("performer") {
        Some(Value::Array(items)) => reference(items.first()),
        other => reference(other),
    };

    ServiceRequestIndex {
        code: coding(resource.get("code")).0,
        status: string(resource, "status"),
        intent: string(resource, "intent"),
        category: category(resource),
        priority: string(resource, "priority"),
        authored: date(resource.get("authoredOn")),
        occurrence: date_choice(resource, "occurrenceDateTime", "occurrencePeriod"),
        requester: reference(resource.get("requester")),
        performer,
        subject: reference(resource.get("subject")),
    }
}

fn first(value: &Value) -> Option<&Value> {
    value.as_array().and_then(|items| items.first())
}

fn string(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// First coded value of a CodeableConcept, with its display (falling back to `text`).
fn coding(concept: Option<&Value>) -> (Option<String>, Option<String>) {
    let Some(concept) = concept else {
        return (None, None);
    };

    let coded = concept
        .get("coding")
        .and_then(Value::as_array)
        .and_then(|codings| codings.iter().find(|c| string(c, "code").is_some()));

    let code = coded.and_then(|c| string(c, "code"));
    let display = coded
        .and_then(|c| string(c, "display"))
        .or_else(|| string(concept, "text"));
    (code, display)
}

fn category(resource: &Value) -> Option<String> {
    let category = resource.get("category")?;
    let concept = match category {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    coding(concept).0
}

fn reference(value: Option<&Value>) -> Option<ReferenceValue> {
    match value? {
        Value::String(s) => ReferenceValue::parse(s),
        Value::Object(obj) => obj
            .get("reference")
            .and_then(Value::as_str)
            .and_then(ReferenceValue::parse),
        _ => None,
    }
}

/// A date or date-time as written, if it parses as either.
fn date(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?.trim();
    let parses = NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || DateTime::parse_from_rfc3339(s).is_ok();
    parses.then(|| s.to_string())
}

fn date_choice(resource: &Value, date_time_key: &str, period_key: &str) -> Option<String> {
    date(resource.get(date_time_key))
        .or_else(|| date(resource.get(period_key).and_then(|p| p.get("start"))))
}
