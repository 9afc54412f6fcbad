//! Index extraction, reference validation and filter resolution.
//!
//! These are the backend-independent steps around every write and search:
//!
//! - [`extractor`] - Derives [`IndexFields`](crate::types::IndexFields) from a payload
//! - [`references`] - Validates subject and result references against live records
//! - [`filters`] - Maps query parameters onto index columns per resource type
//!
//! # Write pipeline
//!
//! ```text
//! payload ──► check_payload ──► extract ──► validate_required
//!                                              │
//!                   (inside the write transaction)
//!                                              ▼
//!                                   validate_references ──► write
//! ```

pub mod extractor;
pub mod filters;
pub mod references;

pub use extractor::{check_payload, extract, validate_required};
pub use filters::{FilterDef, FilterKind, ResolvedFilter, filter_defs, resolve_filters};
pub use references::{ReferenceLookup, ReferencePolicy, validate_reference, validate_references};
