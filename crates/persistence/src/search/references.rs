//! Cross-resource reference validation.
//!
//! A reference is checked in two steps. The textual type prefix is
//! inspected first, independent of what the store holds; only then is
//! the bare id looked up among live records of the expected type.

use tracing::warn;

use crate::error::{ReferenceError, StorageResult};
use crate::types::{IndexFields, ReferenceValue, ResourceType};

/// Existence lookups used while validating references.
///
/// Backends implement this on their open write transaction so the lookups
/// and the dependent write observe the same state.
pub trait ReferenceLookup {
    /// Returns `true` if a non-deleted record of the type has the id.
    fn is_live(&self, resource_type: ResourceType, id: &str) -> StorageResult<bool>;
}

/// How strictly a reference's type prefix is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencePolicy {
    /// A bare id is accepted; an explicit prefix must match.
    PrefixOptional,
    /// The reference must carry the expected type prefix.
    PrefixRequired,
}

/// Validates a single reference.
///
/// # Errors
///
/// * `ReferenceError::WrongReferenceType` - the prefix names another type,
///   or is missing under [`ReferencePolicy::PrefixRequired`]
/// * `ReferenceError::MissingReference` - no live record of `expected` has the id
pub fn validate_reference<L: ReferenceLookup + ?Sized>(
    lookup: &L,
    field: &str,
    reference: &ReferenceValue,
    expected: ResourceType,
    policy: ReferencePolicy,
) -> StorageResult<()> {
    let prefix_ok = match (reference.type_prefix(), policy) {
        (Some(prefix), _) => prefix == expected.as_str(),
        (None, ReferencePolicy::PrefixOptional) => true,
        (None, ReferencePolicy::PrefixRequired) => false,
    };

    if !prefix_ok {
        warn!(
            field,
            reference = reference.raw(),
            expected = %expected,
            "Rejected reference with wrong type"
        );
        return Err(ReferenceError::WrongReferenceType {
            field: field.to_string(),
            reference: reference.raw().to_string(),
            expected_type: expected.to_string(),
            found_type: reference.type_prefix().map(String::from),
        }
        .into());
    }

    if !lookup.is_live(expected, reference.id())? {
        warn!(
            field,
            reference = reference.raw(),
            expected = %expected,
            "Rejected unresolved reference"
        );
        return Err(ReferenceError::MissingReference {
            field: field.to_string(),
            reference: reference.raw().to_string(),
            expected_type: expected.to_string(),
        }
        .into());
    }

    Ok(())
}

/// Validates every reference the write of `fields` depends on.
///
/// The subject must resolve to a Patient. Each DiagnosticReport result must
/// be written `Observation/<id>` and resolve to a live Observation; errors
/// name the entry as `result[i]`.
pub fn validate_references<L: ReferenceLookup + ?Sized>(
    lookup: &L,
    fields: &IndexFields,
) -> StorageResult<()> {
    if let Some(subject) = fields.subject() {
        validate_reference(
            lookup,
            "subject",
            subject,
            ResourceType::Patient,
            ReferencePolicy::PrefixOptional,
        )?;
    }

    for (i, result) in fields.results().iter().enumerate() {
        validate_reference(
            lookup,
            &format!("result[{i}]"),
            result,
            ResourceType::Observation,
            ReferencePolicy::PrefixRequired,
        )?;
    }

    Ok(())
}
