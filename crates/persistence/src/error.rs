//! Error types for the persistence layer.
//!
//! Errors are grouped by the component that raises them: resource state,
//! cross-resource references, payload validation, search parameters,
//! concurrency control and the database backend. [`StorageError::kind`]
//! collapses the hierarchy into the flat [`ErrorKind`] taxonomy callers
//! map onto protocol status codes.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

/// The primary error type for all storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Resource state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Cross-resource reference errors
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Search operation errors
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Concurrency and versioning errors
    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors related to resource state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The resource does not exist or has been soft-deleted.
    #[error("resource not found: {resource_type}/{id}")]
    NotFound { resource_type: String, id: String },

    /// The id has already been used for this resource type.
    #[error("resource already exists: {resource_type}/{id}")]
    AlreadyExists { resource_type: String, id: String },

    /// The id embedded in an update payload differs from the target id.
    #[error("id mismatch for {resource_type}: target id {target_id}, payload id {payload_id}")]
    IdMismatch {
        resource_type: String,
        target_id: String,
        payload_id: String,
    },
}

/// Errors raised while validating cross-resource references.
#[derive(Error, Debug)]
pub enum ReferenceError {
    /// No live resource of the expected type has the referenced id.
    #[error("{field}: reference '{reference}' does not resolve to a live {expected_type}")]
    MissingReference {
        field: String,
        reference: String,
        expected_type: String,
    },

    /// The reference names a type other than the expected one.
    #[error("{field}: reference '{reference}' must point to {expected_type}")]
    WrongReferenceType {
        field: String,
        reference: String,
        expected_type: String,
        found_type: Option<String>,
    },
}

/// Errors related to resource validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The payload is not a usable resource document.
    #[error("invalid resource: {message}")]
    InvalidResource { message: String },

    /// A field required for this resource type is absent.
    #[error("{resource_type} is missing required field: {field}")]
    MissingRequiredField { resource_type: String, field: String },

    /// A reference-typed entry carries no usable reference.
    #[error("{field} has no usable reference")]
    MalformedReference { field: String },

    /// The supplied logical id is not a valid id.
    #[error("invalid resource id: '{id}'")]
    InvalidId { id: String },

    /// The resource type is not served by this store.
    #[error("unsupported resource type: {resource_type}")]
    UnsupportedResourceType { resource_type: String },
}

/// Errors related to search operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// A filter or paging parameter is unknown or malformed.
    #[error("invalid search parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    /// The search was cancelled before it completed.
    #[error("search cancelled")]
    Cancelled,

    /// The search exceeded its time budget.
    #[error("search timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Errors related to concurrency control.
#[derive(Error, Debug)]
pub enum ConcurrencyError {
    /// The record's version moved on since the caller read it.
    #[error("version conflict on {resource_type}/{id}: expected {expected_version}, found {actual_version}")]
    VersionConflict {
        resource_type: String,
        id: String,
        expected_version: u64,
        actual_version: u64,
    },
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Flat classification of a [`StorageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown or soft-deleted id.
    NotFound,
    /// Id collision on create.
    Conflict,
    /// Target id and payload id disagree on update.
    IdMismatch,
    /// A reference does not resolve to a live resource.
    MissingReference,
    /// A reference names the wrong resource type.
    WrongReferenceType,
    /// Malformed filter or out-of-range paging.
    InvalidParameter,
    /// A resource-type-specific rule was violated.
    ValidationFailure,
    /// Compare-and-swap update lost the race.
    VersionConflict,
    /// The search was cancelled or timed out.
    Cancelled,
    /// Infrastructure failure.
    Backend,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not-found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::IdMismatch => "id-mismatch",
            ErrorKind::MissingReference => "missing-reference",
            ErrorKind::WrongReferenceType => "wrong-reference-type",
            ErrorKind::InvalidParameter => "invalid-parameter",
            ErrorKind::ValidationFailure => "validation-failure",
            ErrorKind::VersionConflict => "version-conflict",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Backend => "backend",
        };
        f.write_str(s)
    }
}

impl StorageError {
    /// Returns the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Resource(ResourceError::NotFound { .. }) => ErrorKind::NotFound,
            StorageError::Resource(ResourceError::AlreadyExists { .. }) => ErrorKind::Conflict,
            StorageError::Resource(ResourceError::IdMismatch { .. }) => ErrorKind::IdMismatch,
            StorageError::Reference(ReferenceError::MissingReference { .. }) => {
                ErrorKind::MissingReference
            }
            StorageError::Reference(ReferenceError::WrongReferenceType { .. }) => {
                ErrorKind::WrongReferenceType
            }
            StorageError::Search(SearchError::InvalidParameter { .. }) => {
                ErrorKind::InvalidParameter
            }
            StorageError::Search(SearchError::Cancelled | SearchError::Timeout { .. }) => {
                ErrorKind::Cancelled
            }
            StorageError::Validation(_) => ErrorKind::ValidationFailure,
            StorageError::Concurrency(_) => ErrorKind::VersionConflict,
            StorageError::Backend(_) => ErrorKind::Backend,
        }
    }

    /// Returns the offending field or parameter name, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            StorageError::Reference(ReferenceError::MissingReference { field, .. })
            | StorageError::Reference(ReferenceError::WrongReferenceType { field, .. })
            | StorageError::Validation(ValidationError::MissingRequiredField { field, .. })
            | StorageError::Validation(ValidationError::MalformedReference { field }) => {
                Some(field)
            }
            StorageError::Search(SearchError::InvalidParameter { parameter, .. }) => {
                Some(parameter)
            }
            StorageError::Resource(ResourceError::IdMismatch { .. })
            | StorageError::Validation(ValidationError::InvalidId { .. }) => Some("id"),
            _ => None,
        }
    }

    /// Shorthand for a `NotFound` resource error.
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        StorageError::Resource(ResourceError::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        })
    }

    /// Shorthand for an `InvalidParameter` search error.
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        StorageError::Search(SearchError::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        })
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(_err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        })
    }
}
