//! Search query representation.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::error::{StorageError, StorageResult};

use super::ResourceType;

/// Page size used when `_count` is absent.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: usize = 100;

/// Largest accepted offset; SQLite binds it as a signed 64-bit integer.
pub const MAX_OFFSET: usize = i64::MAX as usize - MAX_PAGE_SIZE;

/// Name of the page size parameter.
pub const COUNT_PARAM: &str = "_count";

/// Name of the offset parameter.
pub const OFFSET_PARAM: &str = "_offset";

/// A search over one resource type.
///
/// Filters are kept as raw `(name, value)` pairs in the order supplied, so
/// result links can re-encode them exactly. Their meaning is resolved per
/// resource type by [`crate::search::resolve_filters`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// The type searched.
    pub resource_type: ResourceType,
    /// Raw `(name, value)` filter pairs.
    pub filters: Vec<(String, String)>,
    /// Entries per page (`_count`).
    pub page_size: usize,
    /// Zero-based index of the first entry (`_offset`).
    pub offset: usize,
}

impl SearchQuery {
    /// Creates an unfiltered query with default paging.
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            filters: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }

    /// Adds a filter. Repeating a name ANDs the values.
    pub fn with_filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((name.into(), value.into()));
        self
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the offset.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Checks the paging bounds.
    pub fn validate(&self) -> StorageResult<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(StorageError::invalid_parameter(
                COUNT_PARAM,
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }
        if self.offset > MAX_OFFSET {
            return Err(StorageError::invalid_parameter(
                OFFSET_PARAM,
                format!("must not exceed {MAX_OFFSET}"),
            ));
        }
        Ok(())
    }

    /// Builds a query from raw query-string pairs.
    ///
    /// `_count` and `_offset` set the paging; every other pair becomes a
    /// filter. Paging values are validated here.
    pub fn from_query_pairs<I, K, V>(resource_type: ResourceType, pairs: I) -> StorageResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = Self::new(resource_type);

        for (name, value) in pairs {
            let (name, value) = (name.as_ref(), value.as_ref());
            match name {
                COUNT_PARAM => query.page_size = parse_paging(COUNT_PARAM, value)?,
                OFFSET_PARAM => query.offset = parse_paging(OFFSET_PARAM, value)?,
                _ => query.filters.push((name.to_string(), value.to_string())),
            }
        }

        query.validate()?;
        Ok(query)
    }

    /// Parses a link produced by [`SearchQuery::to_link`] back into a query.
    pub fn from_link(link: &str) -> StorageResult<Self> {
        let (path, query_string) = link.split_once('?').unwrap_or((link, ""));
        let type_segment = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        let resource_type: ResourceType = type_segment.parse()?;

        Self::from_query_pairs(resource_type, form_urlencoded::parse(query_string.as_bytes()))
    }

    /// Renders the query string: every filter in order, then `_count` and `_offset`.
    pub fn query_string(&self) -> String {
        self.query_string_at(self.offset)
    }

    /// Renders the query string with a different offset.
    pub fn query_string_at(&self, offset: usize) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.filters {
            serializer.append_pair(name, value);
        }
        serializer.append_pair(COUNT_PARAM, &self.page_size.to_string());
        serializer.append_pair(OFFSET_PARAM, &offset.to_string());
        serializer.finish()
    }

    /// Renders the full link for this query at the given offset.
    pub fn to_link(&self, base_url: &str, offset: usize) -> String {
        format!(
            "{}/{}?{}",
            base_url.trim_end_matches('/'),
            self.resource_type,
            self.query_string_at(offset)
        )
    }
}

fn parse_paging(parameter: &str, value: &str) -> StorageResult<usize> {
    let parsed: i64 = value.trim().parse().map_err(|_| {
        StorageError::invalid_parameter(parameter, format!("'{value}' is not an integer"))
    })?;
    usize::try_from(parsed)
        .map_err(|_| StorageError::invalid_parameter(parameter, "must not be negative"))
}
